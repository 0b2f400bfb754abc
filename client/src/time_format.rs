use chrono::{DateTime, Utc};

/// `MM:SS` countdown; negative input clamps to zero.
pub fn format_mmss(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn format_clock(at: DateTime<Utc>) -> String {
    at.format("%H:%M UTC").to_string()
}

/// Human form of a query window, e.g. `11:30–12:00 UTC`.
pub fn format_window(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{}\u{2013}{}", start.format("%H:%M"), format_clock(end))
}

/// Seconds until the next poll given when the last one started.
pub fn seconds_until_next(last_started_ms: f64, now_ms: f64, interval_secs: u32) -> i64 {
    let elapsed = ((now_ms - last_started_ms) / 1000.0).floor() as i64;
    (interval_secs as i64 - elapsed).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn formats_countdown() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(59), "00:59");
        assert_eq!(format_mmss(300), "05:00");
        assert_eq!(format_mmss(-3), "00:00");
    }

    #[test]
    fn formats_clock_and_window() {
        assert_eq!(format_clock(at(9, 5)), "09:05 UTC");
        assert_eq!(format_window(at(11, 30), at(12, 0)), "11:30\u{2013}12:00 UTC");
    }

    #[test]
    fn countdown_from_last_start() {
        assert_eq!(seconds_until_next(0.0, 0.0, 300), 300);
        assert_eq!(seconds_until_next(1_000.0, 61_500.0, 300), 240);
        assert_eq!(seconds_until_next(0.0, 400_000.0, 300), 0);
    }
}
