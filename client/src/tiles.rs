use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::viewport::{MAX_ZOOM, MIN_ZOOM, Viewport};

const MAX_IN_FLIGHT: usize = 8;
const MAX_CACHED: usize = 384;
const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

static TILE_WARNED: AtomicBool = AtomicBool::new(false);

/// A slippy-map tile address. `x` is left unwrapped so tiles east of the
/// antimeridian keep their screen position; use `wrapped_x` for fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: i64,
    pub y: i64,
}

type TileKey = (u8, i64, i64);

impl TileCoord {
    pub fn tiles_per_axis(&self) -> i64 {
        1i64 << self.z
    }

    pub fn wrapped_x(&self) -> i64 {
        self.x.rem_euclid(self.tiles_per_axis())
    }

    fn key(&self) -> TileKey {
        (self.z, self.wrapped_x(), self.y)
    }
}

/// Integer zoom level the tile pyramid is sampled at.
pub fn tile_zoom(zoom: f64) -> u8 {
    zoom.floor().clamp(MIN_ZOOM, MAX_ZOOM) as u8
}

/// Tiles covering the viewport, nearest to the center first.
pub fn visible_tiles(vp: &Viewport) -> Vec<TileCoord> {
    if vp.width <= 0.0 || vp.height <= 0.0 {
        return Vec::new();
    }
    let z = tile_zoom(vp.zoom);
    let n = 1i64 << z;
    let nf = n as f64;
    let ws = vp.world_size();
    let (left, top) = vp.top_left();
    let right = left + vp.width / ws;
    let bottom = top + vp.height / ws;

    let x0 = (left * nf).floor() as i64;
    let x1 = (right * nf).floor() as i64;
    let y0 = ((top * nf).floor() as i64).max(0);
    let y1 = ((bottom * nf).floor() as i64).min(n - 1);

    let mut tiles = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            tiles.push(TileCoord { z, x, y });
        }
    }

    let cx = vp.center_x * nf;
    let cy = vp.center_y * nf;
    tiles.sort_by(|a, b| {
        let da = (a.x as f64 + 0.5 - cx).powi(2) + (a.y as f64 + 0.5 - cy).powi(2);
        let db = (b.x as f64 + 0.5 - cx).powi(2) + (b.y as f64 + 0.5 - cy).powi(2);
        da.total_cmp(&db)
    });
    tiles
}

/// Screen-space `(x, y, size)` of a tile.
pub fn tile_screen_rect(vp: &Viewport, coord: &TileCoord) -> (f64, f64, f64) {
    let n = coord.tiles_per_axis() as f64;
    let (sx, sy) = vp.mercator_to_screen(coord.x as f64 / n, coord.y as f64 / n);
    (sx, sy, vp.world_size() / n)
}

/// Fill a `{s}`/`{z}`/`{x}`/`{y}` URL template.
pub fn tile_url(template: &str, coord: &TileCoord) -> String {
    let x = coord.wrapped_x();
    let subdomain = SUBDOMAINS[((x + coord.y).rem_euclid(SUBDOMAINS.len() as i64)) as usize];
    template
        .replace("{s}", subdomain)
        .replace("{z}", &coord.z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &coord.y.to_string())
}

enum TileSlot {
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

/// Raster tile images keyed by `(z, x, y)`. Bumps `generation` whenever a
/// tile finishes loading so the owning map can repaint.
#[derive(Clone)]
pub struct TileCache {
    template: Rc<str>,
    slots: Rc<RefCell<HashMap<TileKey, TileSlot>>>,
    in_flight: Rc<Cell<usize>>,
    generation: RwSignal<u64>,
}

impl TileCache {
    pub fn new(template: &str, generation: RwSignal<u64>) -> Self {
        Self {
            template: Rc::from(template),
            slots: Rc::new(RefCell::new(HashMap::new())),
            in_flight: Rc::new(Cell::new(0)),
            generation,
        }
    }

    /// Start loads for missing tiles (bounded) and evict far-away entries.
    pub fn request(&self, wanted: &[TileCoord]) {
        for coord in wanted {
            if self.in_flight.get() >= MAX_IN_FLIGHT {
                break;
            }
            if !self.slots.borrow().contains_key(&coord.key()) {
                self.load(*coord);
            }
        }
        self.evict(wanted);
    }

    fn evict(&self, wanted: &[TileCoord]) {
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= MAX_CACHED {
            return;
        }
        let keep: HashSet<TileKey> = wanted.iter().map(TileCoord::key).collect();
        slots.retain(|key, slot| matches!(slot, TileSlot::Loading) || keep.contains(key));
    }

    fn load(&self, coord: TileCoord) {
        let key = coord.key();
        let url = tile_url(&self.template, &coord);
        self.slots.borrow_mut().insert(key, TileSlot::Loading);
        self.in_flight.set(self.in_flight.get() + 1);

        let slots = self.slots.clone();
        let in_flight = self.in_flight.clone();
        let generation = self.generation;
        wasm_bindgen_futures::spawn_local(async move {
            let result = match HtmlImageElement::new() {
                Ok(image) => {
                    image.set_cross_origin(Some("anonymous"));
                    image.set_src(&url);
                    JsFuture::from(image.decode()).await.map(|_| image)
                }
                Err(err) => Err(err),
            };
            in_flight.set(in_flight.get().saturating_sub(1));
            let slot = match result {
                Ok(image) => TileSlot::Ready(image),
                Err(err) => {
                    warn_tiles_once(&format!("Failed to load map tile {url}: {err:?}"));
                    TileSlot::Failed
                }
            };
            slots.borrow_mut().insert(key, slot);
            let _ = generation.try_update(|g| *g = g.wrapping_add(1));
        });
    }

    /// Draw every loaded tile in `tiles`. Missing tiles leave the background.
    pub fn draw(&self, ctx: &CanvasRenderingContext2d, vp: &Viewport, tiles: &[TileCoord]) {
        let slots = self.slots.borrow();
        for coord in tiles {
            let Some(TileSlot::Ready(image)) = slots.get(&coord.key()) else {
                continue;
            };
            let (sx, sy, size) = tile_screen_rect(vp, coord);
            // Half-pixel overlap hides seams at fractional zoom.
            let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                image,
                sx.floor(),
                sy.floor(),
                size.ceil() + 0.5,
                size.ceil() + 0.5,
            );
        }
    }
}

fn warn_tiles_once(message: &str) {
    if TILE_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        web_sys::console::warn_1(&message.into());
    }
}
