pub mod colors;
pub mod error;
pub mod intensity;
pub mod region;
pub mod snapshot;
pub mod window;

pub use colors::{OverlayColor, named_rgb};
pub use error::FetchError;
pub use intensity::IntensityIndex;
pub use region::{RegionReading, RegionRecord};
pub use snapshot::{DisplayState, HeatPoint, IntensitySnapshot, PollOutcome, RegionOverlay};
pub use window::{TimeWindow, intensity_url};
