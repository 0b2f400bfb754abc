use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

pub const WINDOW_MINUTES: i64 = 30;
pub const DEFAULT_API_BASE: &str = "https://api.carbonintensity.org.uk";

/// Query window for one poll: `[end - span, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self::ending_at_with(now, WINDOW_MINUTES)
    }

    /// Negative spans are treated as zero.
    pub fn ending_at_with(now: DateTime<Utc>, minutes: i64) -> Self {
        let span = TimeDelta::try_minutes(minutes.max(0)).unwrap_or(TimeDelta::zero());
        let start = now.checked_sub_signed(span).unwrap_or(now);
        Self { start, end: now }
    }

    pub fn last_30_minutes() -> Self {
        Self::ending_at(Utc::now())
    }

    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn request_path(&self) -> String {
        format!(
            "regional/intensity/{}/{}",
            self.start_iso(),
            self.end_iso()
        )
    }
}

/// Full endpoint URL for `window` under `base`.
pub fn intensity_url(base: &str, window: &TimeWindow) -> String {
    format!("{}/{}", base.trim_end_matches('/'), window.request_path())
}
