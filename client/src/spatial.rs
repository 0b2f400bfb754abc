use carbon_map_shared::{RegionOverlay, snapshot::CIRCLE_RADIUS_M};

use crate::viewport::Viewport;

/// Circles smaller than this on screen still get a usable hover target.
const MIN_HIT_RADIUS_PX: f64 = 6.0;

/// On-screen circle radius for an overlay.
pub fn circle_radius_px(vp: &Viewport, overlay: &RegionOverlay) -> f64 {
    vp.meters_to_pixels(CIRCLE_RADIUS_M, overlay.reading.latitude)
}

/// Index of the overlay under a screen point. Later overlays are drawn on
/// top, so they win.
pub fn find_region_at(
    overlays: &[RegionOverlay],
    vp: &Viewport,
    sx: f64,
    sy: f64,
) -> Option<usize> {
    overlays.iter().enumerate().rev().find_map(|(idx, overlay)| {
        let (cx, cy) = vp.lat_lon_to_screen(overlay.reading.latitude, overlay.reading.longitude);
        let r = circle_radius_px(vp, overlay).max(MIN_HIT_RADIUS_PX);
        let (dx, dy) = (sx - cx, sy - cy);
        (dx * dx + dy * dy <= r * r).then_some(idx)
    })
}
