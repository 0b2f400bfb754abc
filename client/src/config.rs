use carbon_map_shared::window::{DEFAULT_API_BASE, WINDOW_MINUTES};

pub const DEFAULT_POLL_INTERVAL_SECS: u32 = 300;
/// Largest interval whose millisecond value still fits the `i32` delay
/// that `setInterval` takes.
pub const MAX_POLL_INTERVAL_SECS: u32 = i32::MAX as u32 / 1_000;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "\u{00A9} OpenStreetMap contributors";
pub const ATTRIBUTION_URL: &str = "https://www.openstreetmap.org/copyright";
pub const MARKER_ICON_URL: &str = "https://cdn-icons-png.flaticon.com/512/252/252025.png";

pub const INTENSITY_MAP_CENTER: (f64, f64) = (54.5, -2.5);
pub const INTENSITY_MAP_ZOOM: f64 = 6.0;
pub const STREET_MAP_CENTER: (f64, f64) = (51.505, -0.09);
pub const STREET_MAP_ZOOM: f64 = 13.0;
pub const MARKER_POSITION: (f64, f64) = (51.5, -0.09);
pub const MARKER_POPUP: &str = "Marker icon.";

/// Runtime settings, read once from the page query string at mount.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base: String,
    pub poll_interval_secs: u32,
    pub window_minutes: i64,
    pub tile_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            window_minutes: WINDOW_MINUTES,
            tile_url: DEFAULT_TILE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build from a parameter lookup. Missing, empty or non-positive values
    /// keep their defaults, as does a poll interval above
    /// `MAX_POLL_INTERVAL_SECS`.
    pub fn from_params(get: impl Fn(&str) -> Option<String>) -> Self {
        let text = |name: &str, default: &str| {
            get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            api_base: text("api", DEFAULT_API_BASE),
            poll_interval_secs: get("poll_secs")
                .and_then(|v| v.trim().parse().ok())
                .filter(|v| *v > 0 && *v <= MAX_POLL_INTERVAL_SECS)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            window_minutes: get("window_mins")
                .and_then(|v| v.trim().parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(WINDOW_MINUTES),
            tile_url: text("tiles", DEFAULT_TILE_URL),
        }
    }

    pub fn from_location() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Ok(search) = window.location().search() else {
            return Self::default();
        };
        let Ok(params) = web_sys::UrlSearchParams::new_with_str(&search) else {
            return Self::default();
        };
        Self::from_params(|name| params.get(name))
    }

    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_secs.saturating_mul(1_000)
    }
}
