use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use carbon_map_shared::{HeatPoint, named_rgb};

use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatOptions {
    /// Weight that maps to full opacity.
    pub max: f64,
    pub radius: f64,
    pub blur: f64,
    pub min_opacity: f64,
}

pub const HEAT_OPTIONS: HeatOptions = HeatOptions {
    max: 300.0,
    radius: 25.0,
    blur: 15.0,
    min_opacity: 0.05,
};

pub const HEAT_GRADIENT: &[(f64, &str)] = &[
    (0.2, "green"),
    (0.4, "yellow"),
    (0.6, "orange"),
    (0.8, "red"),
];

const PALETTE_LEN: usize = 256;

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// 256 RGBA entries indexed by heat alpha. Positions outside the first and
/// last stop take the nearest stop's color. Unknown color names are skipped.
pub fn build_palette(stops: &[(f64, &str)]) -> Vec<u8> {
    let mut resolved: Vec<(f64, (u8, u8, u8))> = stops
        .iter()
        .filter_map(|(pos, name)| named_rgb(name).map(|rgb| (pos.clamp(0.0, 1.0), rgb)))
        .collect();
    resolved.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut palette = vec![0u8; PALETTE_LEN * 4];
    let (Some(first), Some(last)) = (resolved.first().copied(), resolved.last().copied()) else {
        return palette;
    };

    for (i, entry) in palette.chunks_exact_mut(4).enumerate() {
        let t = i as f64 / (PALETTE_LEN - 1) as f64;
        let (r, g, b) = if t <= first.0 {
            first.1
        } else if t >= last.0 {
            last.1
        } else {
            resolved
                .windows(2)
                .find(|w| t >= w[0].0 && t <= w[1].0)
                .map(|w| {
                    let span = (w[1].0 - w[0].0).max(f64::EPSILON);
                    let f = (t - w[0].0) / span;
                    let (a, b) = (w[0].1, w[1].1);
                    (lerp_u8(a.0, b.0, f), lerp_u8(a.1, b.1, f), lerp_u8(a.2, b.2, f))
                })
                .unwrap_or(last.1)
        };
        entry.copy_from_slice(&[r, g, b, 255]);
    }
    palette
}

/// Brush opacity for one point.
pub fn point_alpha(weight: f64, max: f64, min_opacity: f64) -> f64 {
    let floor = min_opacity.clamp(0.0, 1.0);
    if max <= 0.0 {
        return 1.0;
    }
    (weight / max).clamp(floor, 1.0)
}

/// Recolor RGBA pixels by their alpha. Alpha is kept; transparent pixels
/// are left alone.
pub fn colorize(pixels: &mut [u8], palette: &[u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let j = px[3] as usize * 4;
        if j == 0 || j + 2 >= palette.len() {
            continue;
        }
        px[0] = palette[j];
        px[1] = palette[j + 1];
        px[2] = palette[j + 2];
    }
}

/// Offscreen alpha-stamp heat layer. Points are stamped with a blurred
/// circular brush, then the accumulated alpha is mapped through the palette.
pub struct HeatRenderer {
    options: HeatOptions,
    palette: Vec<u8>,
    brush: HtmlCanvasElement,
    surface: HtmlCanvasElement,
    surface_ctx: CanvasRenderingContext2d,
}

impl HeatRenderer {
    pub fn new(options: HeatOptions, gradient: &[(f64, &str)]) -> Result<Self, String> {
        let r2 = options.radius + options.blur;
        let size = (r2 * 2.0).ceil() as u32;
        let (brush, brush_ctx) = create_canvas(size, size)?;

        // The circle is drawn off-canvas; only its shadow lands inside.
        brush_ctx.set_shadow_offset_x(r2 * 2.0);
        brush_ctx.set_shadow_offset_y(r2 * 2.0);
        brush_ctx.set_shadow_blur(options.blur);
        brush_ctx.set_shadow_color("black");
        brush_ctx.begin_path();
        brush_ctx
            .arc(-r2, -r2, options.radius, 0.0, std::f64::consts::TAU)
            .map_err(|e| format!("heat brush arc failed: {e:?}"))?;
        brush_ctx.close_path();
        brush_ctx.fill();

        let (surface, surface_ctx) = create_canvas(1, 1)?;
        Ok(Self {
            options,
            palette: build_palette(gradient),
            brush,
            surface,
            surface_ctx,
        })
    }

    /// Render `points` for `vp` and composite the result onto `target`
    /// (expected to be in CSS pixel coordinates).
    pub fn render(
        &self,
        target: &CanvasRenderingContext2d,
        vp: &Viewport,
        points: &[HeatPoint],
    ) -> Result<(), String> {
        let w = vp.width.ceil() as u32;
        let h = vp.height.ceil() as u32;
        if w == 0 || h == 0 || points.is_empty() {
            return Ok(());
        }
        if self.surface.width() != w || self.surface.height() != h {
            self.surface.set_width(w);
            self.surface.set_height(h);
        }

        let ctx = &self.surface_ctx;
        ctx.clear_rect(0.0, 0.0, w as f64, h as f64);

        let r2 = self.options.radius + self.options.blur;
        for point in points {
            let (sx, sy) = vp.lat_lon_to_screen(point.lat, point.lon);
            if sx < -r2 || sy < -r2 || sx > w as f64 + r2 || sy > h as f64 + r2 {
                continue;
            }
            ctx.set_global_alpha(point_alpha(
                point.weight as f64,
                self.options.max,
                self.options.min_opacity,
            ));
            ctx.draw_image_with_html_canvas_element(&self.brush, sx - r2, sy - r2)
                .map_err(|e| format!("heat stamp failed: {e:?}"))?;
        }
        ctx.set_global_alpha(1.0);

        let image = ctx
            .get_image_data(0.0, 0.0, w as f64, h as f64)
            .map_err(|e| format!("heat readback failed: {e:?}"))?;
        let mut pixels = image.data();
        colorize(&mut pixels.0, &self.palette);
        let colored =
            ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels.0.as_slice()), w, h)
                .map_err(|e| format!("heat image failed: {e:?}"))?;
        ctx.put_image_data(&colored, 0.0, 0.0)
            .map_err(|e| format!("heat writeback failed: {e:?}"))?;

        target
            .draw_image_with_html_canvas_element(&self.surface, 0.0, 0.0)
            .map_err(|e| format!("heat composite failed: {e:?}"))
    }
}

fn create_canvas(
    width: u32,
    height: u32,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| "no document".to_string())?;
    let canvas = document
        .create_element("canvas")
        .map_err(|e| format!("create canvas failed: {e:?}"))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| "element is not a canvas".to_string())?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        .ok_or_else(|| "2d context unavailable".to_string())?;
    Ok((canvas, ctx))
}
