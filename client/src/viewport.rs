use std::f64::consts::PI;

/// Edge length of one raster tile in CSS pixels.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 18.0;
const ZOOM_SENSITIVITY: f64 = 0.005;
/// Web-Mercator latitude limit.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
const EARTH_CIRCUMFERENCE_M: f64 = 40_075_016.686;

/// Slippy-map camera. The center is kept in normalized Web-Mercator space
/// (`0..1` on both axes, y pointing south) so pan/zoom stay linear.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

/// Project lat/lon to normalized Web-Mercator coordinates.
pub fn project(lat: f64, lon: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

impl Viewport {
    pub fn centered_on(lat: f64, lon: f64, zoom: f64) -> Self {
        let (center_x, center_y) = project(lat, lon);
        Self {
            center_x,
            center_y,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width: 0.0,
            height: 0.0,
        }
    }

    /// World edge length in CSS pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Normalized Mercator coordinates of the screen's top-left corner.
    pub fn top_left(&self) -> (f64, f64) {
        let ws = self.world_size();
        (
            self.center_x - self.width / 2.0 / ws,
            self.center_y - self.height / 2.0 / ws,
        )
    }

    pub fn mercator_to_screen(&self, mx: f64, my: f64) -> (f64, f64) {
        let ws = self.world_size();
        (
            (mx - self.center_x) * ws + self.width / 2.0,
            (my - self.center_y) * ws + self.height / 2.0,
        )
    }

    pub fn screen_to_mercator(&self, sx: f64, sy: f64) -> (f64, f64) {
        let ws = self.world_size();
        (
            self.center_x + (sx - self.width / 2.0) / ws,
            self.center_y + (sy - self.height / 2.0) / ws,
        )
    }

    pub fn lat_lon_to_screen(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (mx, my) = project(lat, lon);
        self.mercator_to_screen(mx, my)
    }

    /// Ground distance in meters expressed as screen pixels at `lat`.
    pub fn meters_to_pixels(&self, meters: f64, lat: f64) -> f64 {
        let cos_lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians().cos();
        let meters_per_pixel = EARTH_CIRCUMFERENCE_M * cos_lat / self.world_size();
        if meters_per_pixel <= 0.0 {
            return 0.0;
        }
        meters / meters_per_pixel
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let ws = self.world_size();
        self.center_x = (self.center_x - dx / ws).clamp(0.0, 1.0);
        self.center_y = (self.center_y - dy / ws).clamp(0.0, 1.0);
    }

    /// Zoom toward a focus point (screen coordinates). Positive `delta`
    /// zooms out, matching wheel `deltaY`.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let new_zoom = (self.zoom - delta * ZOOM_SENSITIVITY).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        // Keep the point under the cursor fixed.
        let (fx, fy) = self.screen_to_mercator(screen_x, screen_y);
        self.zoom = new_zoom;
        let ws = self.world_size();
        self.center_x = (fx - (screen_x - self.width / 2.0) / ws).clamp(0.0, 1.0);
        self.center_y = (fy - (screen_y - self.height / 2.0) / ws).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unproject(x: f64, y: f64) -> (f64, f64) {
        let lon = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
        (lat, lon)
    }

    fn screen_to_lat_lon(vp: &Viewport, sx: f64, sy: f64) -> (f64, f64) {
        let (mx, my) = vp.screen_to_mercator(sx, sy);
        unproject(mx, my)
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < tolerance,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn origin_projects_to_world_center() {
        let (x, y) = project(0.0, 0.0);
        assert_close(x, 0.5, 1e-12);
        assert_close(y, 0.5, 1e-12);
    }

    #[test]
    fn projection_roundtrips_uk_coordinates() {
        for (lat, lon) in [(51.5, -0.1), (54.5, -2.5), (57.5, -4.2), (50.1, -5.5)] {
            let (x, y) = project(lat, lon);
            let (lat2, lon2) = unproject(x, y);
            assert_close(lat2, lat, 1e-9);
            assert_close(lon2, lon, 1e-9);
        }
    }

    #[test]
    fn center_maps_to_screen_middle() {
        let mut vp = Viewport::centered_on(54.5, -2.5, 6.0);
        vp.resize(800.0, 600.0);
        let (sx, sy) = vp.lat_lon_to_screen(54.5, -2.5);
        assert_close(sx, 400.0, 1e-6);
        assert_close(sy, 300.0, 1e-6);

        let (lat, lon) = screen_to_lat_lon(&vp, 400.0, 300.0);
        assert_close(lat, 54.5, 1e-9);
        assert_close(lon, -2.5, 1e-9);
    }

    #[test]
    fn zoom_is_clamped() {
        let vp = Viewport::centered_on(0.0, 0.0, 30.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        let vp = Viewport::centered_on(0.0, 0.0, 0.0);
        assert_eq!(vp.zoom, MIN_ZOOM);

        let mut vp = Viewport::centered_on(51.5, -0.1, 6.0);
        vp.resize(800.0, 600.0);
        vp.zoom_at(1_000_000.0, 400.0, 300.0);
        assert_eq!(vp.zoom, MIN_ZOOM);
        vp.zoom_at(-1_000_000.0, 400.0, 300.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
    }

    #[test]
    fn zoom_keeps_focus_point_fixed() {
        let mut vp = Viewport::centered_on(54.5, -2.5, 6.0);
        vp.resize(800.0, 600.0);
        let before = screen_to_lat_lon(&vp, 200.0, 150.0);
        vp.zoom_at(-200.0, 200.0, 150.0);
        assert_close(vp.zoom, 7.0, 1e-9);
        let after = screen_to_lat_lon(&vp, 200.0, 150.0);
        assert_close(after.0, before.0, 1e-9);
        assert_close(after.1, before.1, 1e-9);
    }

    #[test]
    fn pan_moves_content_with_pointer() {
        let mut vp = Viewport::centered_on(54.5, -2.5, 6.0);
        vp.resize(800.0, 600.0);
        let (sx, sy) = vp.lat_lon_to_screen(51.5, -0.1);
        vp.pan(25.0, -40.0);
        let (sx2, sy2) = vp.lat_lon_to_screen(51.5, -0.1);
        assert_close(sx2 - sx, 25.0, 1e-6);
        assert_close(sy2 - sy, -40.0, 1e-6);
    }

    #[test]
    fn circle_radius_grows_with_latitude() {
        let vp = Viewport::centered_on(54.5, -2.5, 6.0);
        let equator = vp.meters_to_pixels(10_000.0, 0.0);
        let london = vp.meters_to_pixels(10_000.0, 51.5);
        assert!(london > equator);
        assert_close(equator, 10_000.0 / (EARTH_CIRCUMFERENCE_M / vp.world_size()), 1e-9);
    }
}
