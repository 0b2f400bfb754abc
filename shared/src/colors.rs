/// Circle color for a region overlay, keyed off its intensity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayColor {
    Green,
    Blue,
    Red,
}

impl OverlayColor {
    /// CSS color keyword, usable directly as a canvas fill/stroke style.
    pub fn css_name(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Red => "red",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        // Keyword table always covers the overlay palette.
        named_rgb(self.css_name()).unwrap_or((255, 0, 0))
    }
}

/// RGB value of the CSS color keywords used by the overlay and heat palettes.
pub fn named_rgb(name: &str) -> Option<(u8, u8, u8)> {
    match name.trim().to_ascii_lowercase().as_str() {
        "green" => Some((0, 128, 0)),
        "lime" => Some((0, 255, 0)),
        "blue" => Some((0, 0, 255)),
        "red" => Some((255, 0, 0)),
        "yellow" => Some((255, 255, 0)),
        "orange" => Some((255, 165, 0)),
        "white" => Some((255, 255, 255)),
        "black" => Some((0, 0, 0)),
        _ => None,
    }
}
