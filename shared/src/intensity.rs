use serde::{Deserialize, Serialize};

use crate::colors::OverlayColor;

pub const WEIGHT_DEFAULT: u32 = 50;
pub const WEIGHT_MODERATE: u32 = 100;
pub const WEIGHT_HIGH: u32 = 200;

/// Qualitative grid carbon-intensity label as published per region.
///
/// Labels outside the published set are kept verbatim in `Unrecognized`
/// rather than being folded into one of the known levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntensityIndex {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
    Unrecognized(String),
}

impl IntensityIndex {
    /// Labels are matched exactly; upstream always sends lowercase.
    pub fn from_label(label: &str) -> Self {
        match label {
            "very low" => Self::VeryLow,
            "low" => Self::Low,
            "moderate" => Self::Moderate,
            "high" => Self::High,
            "very high" => Self::VeryHigh,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::VeryLow => "very low",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very high",
            Self::Unrecognized(label) => label,
        }
    }

    /// Heat-layer weight. Only `moderate` and `high` are boosted; every other
    /// label, `low` and `very high` included, weighs the same as a missing one.
    pub fn heat_weight(&self) -> u32 {
        match self {
            Self::Moderate => WEIGHT_MODERATE,
            Self::High => WEIGHT_HIGH,
            _ => WEIGHT_DEFAULT,
        }
    }

    pub fn overlay_color(&self) -> OverlayColor {
        match self {
            Self::Moderate => OverlayColor::Green,
            Self::High => OverlayColor::Blue,
            _ => OverlayColor::Red,
        }
    }
}

impl From<String> for IntensityIndex {
    fn from(label: String) -> Self {
        match Self::from_label(&label) {
            Self::Unrecognized(_) => Self::Unrecognized(label),
            known => known,
        }
    }
}

impl From<IntensityIndex> for String {
    fn from(index: IntensityIndex) -> Self {
        match index {
            IntensityIndex::Unrecognized(label) => label,
            known => known.label().to_string(),
        }
    }
}
