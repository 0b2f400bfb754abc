use std::fmt;

/// Why a poll cycle produced no data. Every variant means the same thing to
/// the caller: keep showing what you had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure or unreadable body.
    Network(String),
    /// Upstream answered with a non-success status code.
    Status(u16),
    /// Body was not JSON or did not contain `data[0].regions`.
    Shape(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "{msg}"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Shape(msg) => write!(f, "unexpected response shape: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}
