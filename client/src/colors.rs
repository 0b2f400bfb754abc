use carbon_map_shared::{OverlayColor, snapshot::CIRCLE_FILL_OPACITY};

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// Brighten a color by a factor (1.0 = no change, >1.0 = brighter).
/// Channels at zero are lifted so pure primaries still change.
pub fn brighten(r: u8, g: u8, b: u8, factor: f64) -> (u8, u8, u8) {
    let lift = |c: u8| ((c.max(24) as f64 * factor).min(255.0)) as u8;
    (lift(r), lift(g), lift(b))
}

pub fn overlay_fill(color: OverlayColor) -> String {
    let (r, g, b) = color.rgb();
    rgba_css(r, g, b, CIRCLE_FILL_OPACITY)
}

/// Stroke style for a circle; the hovered one is drawn brighter.
pub fn overlay_stroke(color: OverlayColor, hovered: bool) -> String {
    if !hovered {
        return color.css_name().to_string();
    }
    let (r, g, b) = color.rgb();
    let (r, g, b) = brighten(r, g, b, 1.4);
    rgba_css(r, g, b, 1.0)
}
