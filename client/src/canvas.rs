use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent, WheelEvent};

use carbon_map_shared::RegionOverlay;

use crate::app::{Display, Hovered, MousePos, Tick};
use crate::colors::{overlay_fill, overlay_stroke};
use crate::config::{ATTRIBUTION_URL, ClientConfig, MARKER_POPUP, TILE_ATTRIBUTION};
use crate::heat::{HEAT_GRADIENT, HEAT_OPTIONS, HeatRenderer};
use crate::icons::{MarkerIcon, marker_rect, popup_anchor};
use crate::render_loop::FrameScheduler;
use crate::spatial::{circle_radius_px, find_region_at};
use crate::tiles::{TileCache, visible_tiles};
use crate::viewport::Viewport;

const BACKGROUND: &str = "#dddddd";
const CIRCLE_LINE_WIDTH: f64 = 3.0;
const CIRCLE_LINE_WIDTH_HOVER: f64 = 4.0;
const POPUP_FONT: &str = "13px 'Helvetica Neue', Arial, sans-serif";
const POPUP_PADDING: f64 = 10.0;
const POPUP_HEIGHT: f64 = 30.0;
const POPUP_TIP: f64 = 8.0;

/// What a map draws on top of its tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapLayers {
    /// Heat layer plus one circle per region from the display snapshot.
    pub regions: bool,
    /// Marker with an open popup at this lat/lon.
    pub marker: Option<(f64, f64)>,
}

fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .filter(|r| *r > 0.0)
        .unwrap_or(1.0)
}

fn local_point(
    canvas_ref: NodeRef<leptos::html::Canvas>,
    client_x: f64,
    client_y: f64,
) -> (f64, f64) {
    canvas_ref
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (client_x - rect.left(), client_y - rect.top())
        })
        .unwrap_or((client_x, client_y))
}

/// Slippy map drawn on a single 2D canvas: OSM tiles, then the optional
/// heat layer, region circles and marker.
#[component]
pub fn MapCanvas(
    center: (f64, f64),
    zoom: f64,
    height: &'static str,
    layers: MapLayers,
) -> impl IntoView {
    let Display(display) = expect_context();
    let Hovered(hovered) = expect_context();
    let MousePos(mouse_pos) = expect_context();
    let Tick(tick) = expect_context();
    let marker_icon: RwSignal<Option<MarkerIcon>, LocalStorage> = expect_context();
    let config: ClientConfig = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let viewport = RwSignal::new(Viewport::centered_on(center.0, center.1, zoom));
    let tile_generation = RwSignal::new(0u64);
    let tiles = TileCache::new(&config.tile_url, tile_generation);

    let heat = if layers.regions {
        match HeatRenderer::new(HEAT_OPTIONS, HEAT_GRADIENT) {
            Ok(renderer) => Some(renderer),
            Err(err) => {
                web_sys::console::warn_1(&format!("Heat layer disabled: {err}").into());
                None
            }
        }
    } else {
        None
    };
    let heat_warned = Cell::new(false);

    // Drag state
    let is_dragging = Rc::new(Cell::new(false));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    // Pinch state
    let pinch_dist = Rc::new(Cell::new(0.0f64));

    // Cached 2D context (invalidated on canvas resize)
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let scheduler = Rc::new(FrameScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let w = parent.client_width() as f64;
        let h = parent.client_height() as f64;
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        let dpr = device_pixel_ratio();
        let pw = (w * dpr).round().max(1.0) as u32;
        let ph = (h * dpr).round().max(1.0) as u32;
        if canvas.width() != pw || canvas.height() != ph {
            canvas.set_width(pw);
            canvas.set_height(ph);
            *cached_ctx.borrow_mut() = None;
        }
        viewport.update_untracked(|vp| vp.resize(w, h));
        let vp = viewport.get_untracked();

        let ctx = {
            let mut slot = cached_ctx.borrow_mut();
            if slot.is_none() {
                let Some(ctx) = canvas
                    .get_context("2d")
                    .ok()
                    .flatten()
                    .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
                else {
                    return;
                };
                *slot = Some(ctx);
            }
            let Some(ctx) = slot.clone() else {
                return;
            };
            ctx
        };
        // All drawing below is in CSS pixels.
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
        ctx.set_fill_style_str(BACKGROUND);
        ctx.fill_rect(0.0, 0.0, w, h);

        let wanted = visible_tiles(&vp);
        tiles.request(&wanted);
        tiles.draw(&ctx, &vp, &wanted);

        if layers.regions {
            let hovered_key = hovered.get_untracked();
            display.with_untracked(|state| {
                if let Some(heat) = heat.as_ref()
                    && let Err(err) = heat.render(&ctx, &vp, state.heat_points())
                    && !heat_warned.replace(true)
                {
                    web_sys::console::warn_1(&format!("Heat layer render failed: {err}").into());
                }
                draw_overlays(&ctx, &vp, state.overlays(), hovered_key.as_deref());
            });
        }

        if let Some(position) = layers.marker {
            marker_icon.with_untracked(|icon| {
                draw_marker(&ctx, &vp, icon.as_ref(), position);
            });
        }
    }));

    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            viewport.track();
            tile_generation.track();
            marker_icon.track();
            if layers.regions {
                display.track();
                hovered.track();
            }
            scheduler.mark_dirty();
        }
    });

    // Container size changes are picked up on the clock tick.
    Effect::new({
        let scheduler = scheduler.clone();
        let last_size = Cell::new((0i32, 0i32));
        move || {
            tick.track();
            let Some(parent) = canvas_ref.get_untracked().and_then(|c| c.parent_element()) else {
                return;
            };
            let size = (parent.client_width(), parent.client_height());
            if size != last_size.get() {
                last_size.set(size);
                scheduler.mark_dirty();
            }
        }
    });

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let (x, y) = local_point(canvas_ref, e.client_x() as f64, e.client_y() as f64);
        let delta = e.delta_y();
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            if layers.regions && hovered.get_untracked().is_some() {
                hovered.set(None);
            }
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                viewport.update(|vp| vp.pan(dx, dy));
                return;
            }
            if !layers.regions {
                return;
            }
            let (x, y) = local_point(canvas_ref, e.client_x() as f64, e.client_y() as f64);
            let vp = viewport.get_untracked();
            let hit = display.with_untracked(|state| {
                let overlays = state.overlays();
                find_region_at(overlays, &vp, x, y).map(|idx| overlays[idx].reading.key())
            });
            if hit != hovered.get_untracked() {
                hovered.set(hit);
            }
            if hovered.get_untracked().is_some() {
                mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if layers.regions && hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() != 2 {
                return;
            }
            e.prevent_default();
            let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                return;
            };
            let dx = (t1.client_x() - t0.client_x()) as f64;
            let dy = (t1.client_y() - t0.client_y()) as f64;
            let new_dist = (dx * dx + dy * dy).sqrt();
            let old_dist = pinch_dist.get();
            if old_dist > 0.0 {
                let (mid_x, mid_y) = local_point(
                    canvas_ref,
                    (t0.client_x() + t1.client_x()) as f64 / 2.0,
                    (t0.client_y() + t1.client_y()) as f64 / 2.0,
                );
                let delta = -(new_dist - old_dist) * 2.0;
                viewport.update(|vp| vp.zoom_at(delta, mid_x, mid_y));
            }
            pinch_dist.set(new_dist);
        }
    };

    view! {
        <div style=format!(
            "position: relative; width: 100%; height: {height}; overflow: hidden; background: {BACKGROUND};"
        )>
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
                on:wheel=on_wheel
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=on_pointer_up
                on:pointerleave=on_pointer_leave
                on:touchstart=on_touch_start
                on:touchmove=on_touch_move
            />
            <Attribution />
        </div>
    }
}

#[component]
fn Attribution() -> impl IntoView {
    view! {
        <div style="position: absolute; right: 0; bottom: 0; z-index: 2; padding: 1px 6px; background: rgba(255,255,255,0.8); font: 11px 'Helvetica Neue', Arial, sans-serif; color: #333;">
            <a href=ATTRIBUTION_URL target="_blank" rel="noopener noreferrer" style="color: #0078a8; text-decoration: none;">
                {TILE_ATTRIBUTION}
            </a>
        </div>
    }
}

fn draw_overlays(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    overlays: &[RegionOverlay],
    hovered: Option<&str>,
) {
    for overlay in overlays {
        let reading = &overlay.reading;
        let (cx, cy) = vp.lat_lon_to_screen(reading.latitude, reading.longitude);
        let r = circle_radius_px(vp, overlay).max(1.0);
        if cx + r < 0.0 || cy + r < 0.0 || cx - r > vp.width || cy - r > vp.height {
            continue;
        }
        let is_hovered = hovered.is_some_and(|key| key == reading.key());

        ctx.begin_path();
        if ctx.arc(cx, cy, r, 0.0, std::f64::consts::TAU).is_err() {
            continue;
        }
        ctx.set_fill_style_str(&overlay_fill(overlay.color));
        ctx.fill();
        ctx.set_stroke_style_str(&overlay_stroke(overlay.color, is_hovered));
        ctx.set_line_width(if is_hovered {
            CIRCLE_LINE_WIDTH_HOVER
        } else {
            CIRCLE_LINE_WIDTH
        });
        ctx.stroke();
    }
}

/// Popup body `(left, top, width, height)` for a tip at `(tx, ty)`.
fn popup_box(tx: f64, ty: f64, text_width: f64) -> (f64, f64, f64, f64) {
    let width = text_width + POPUP_PADDING * 2.0;
    (
        tx - width / 2.0,
        ty - POPUP_TIP - POPUP_HEIGHT,
        width,
        POPUP_HEIGHT,
    )
}

fn draw_marker(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    icon: Option<&MarkerIcon>,
    (lat, lon): (f64, f64),
) {
    let (sx, sy) = vp.lat_lon_to_screen(lat, lon);
    if let Some(icon) = icon {
        let (x, y, w, h) = marker_rect(sx, sy);
        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(&icon.image, x, y, w, h);
    }
    let (tx, ty) = popup_anchor(sx, sy);
    draw_popup(ctx, tx, ty, MARKER_POPUP);
}

fn draw_popup(ctx: &CanvasRenderingContext2d, tx: f64, ty: f64, text: &str) {
    ctx.set_font(POPUP_FONT);
    let text_width = ctx.measure_text(text).map(|m| m.width()).unwrap_or(80.0);
    let (left, top, width, height) = popup_box(tx, ty, text_width);
    let bottom = top + height;

    ctx.begin_path();
    ctx.move_to(left, top);
    ctx.line_to(left + width, top);
    ctx.line_to(left + width, bottom);
    ctx.line_to(tx + POPUP_TIP, bottom);
    ctx.line_to(tx, ty);
    ctx.line_to(tx - POPUP_TIP, bottom);
    ctx.line_to(left, bottom);
    ctx.close_path();
    ctx.set_fill_style_str("#ffffff");
    ctx.fill();
    ctx.set_stroke_style_str("rgba(0,0,0,0.25)");
    ctx.set_line_width(1.0);
    ctx.stroke();

    ctx.set_fill_style_str("#333333");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let _ = ctx.fill_text(text, tx, top + height / 2.0);
}
