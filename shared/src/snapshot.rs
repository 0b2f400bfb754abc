use serde::Deserialize;

use crate::colors::OverlayColor;
use crate::error::FetchError;
use crate::region::{RegionReading, RegionRecord};
use crate::window::TimeWindow;

/// Circle radius drawn around each region centroid, in meters.
pub const CIRCLE_RADIUS_M: f64 = 10_000.0;
pub const CIRCLE_FILL_OPACITY: f64 = 0.5;

/// `(latitude, longitude, weight)` triple feeding the heat layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub weight: u32,
}

impl HeatPoint {
    pub fn from_reading(reading: &RegionReading) -> Self {
        Self {
            lat: reading.latitude,
            lon: reading.longitude,
            weight: reading.index.heat_weight(),
        }
    }
}

/// Everything needed to draw and describe one region circle.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOverlay {
    pub reading: RegionReading,
    pub color: OverlayColor,
}

impl RegionOverlay {
    pub fn from_reading(reading: RegionReading) -> Self {
        let color = reading.index.overlay_color();
        Self { reading, color }
    }

    /// Tooltip body, one entry per line.
    pub fn tooltip_lines(&self) -> Vec<String> {
        let reading = &self.reading;
        let mut lines = vec![reading.short_name.clone()];
        if let Some(dno) = &reading.dno_region {
            lines.push(format!("DNO: {dno}"));
        }
        lines.push(format!("Intensity: {}", reading.index.label()));
        if let Some(forecast) = reading.forecast {
            lines.push(format!("Forecast: {forecast:.0} gCO2/kWh"));
        }
        lines.push(format!(
            "Timestamp: {}",
            reading.last_updated.as_deref().unwrap_or("unknown")
        ));
        lines
    }
}

/// Result of one successful poll. Replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensitySnapshot {
    pub window: TimeWindow,
    pub overlays: Vec<RegionOverlay>,
    pub heat_points: Vec<HeatPoint>,
    /// Region entries present in the response.
    pub received: usize,
    /// Entries dropped for a missing or non-numeric position or a missing
    /// string classification.
    pub dropped: usize,
}

#[derive(Deserialize)]
struct Envelope {
    data: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct PeriodEntry {
    regions: Vec<serde_json::Value>,
}

impl IntensitySnapshot {
    pub fn from_json(window: TimeWindow, body: &str) -> Result<Self, FetchError> {
        let envelope: Envelope =
            serde_json::from_str(body).map_err(|e| FetchError::Shape(e.to_string()))?;
        Self::from_envelope(window, envelope)
    }

    fn from_envelope(window: TimeWindow, envelope: Envelope) -> Result<Self, FetchError> {
        let Some(first) = envelope.data.into_iter().next() else {
            return Err(FetchError::Shape("empty data array".into()));
        };
        let period: PeriodEntry = serde_json::from_value(first)
            .map_err(|e| FetchError::Shape(format!("data[0]: {e}")))?;
        Ok(Self::from_regions(window, period.regions))
    }

    /// Filters and transforms raw region values. Never fails: unusable
    /// entries are counted in `dropped`.
    pub fn from_regions(
        window: TimeWindow,
        regions: impl IntoIterator<Item = serde_json::Value>,
    ) -> Self {
        let mut overlays = Vec::new();
        let mut heat_points = Vec::new();
        let mut received = 0usize;

        for value in regions {
            received += 1;
            let Some(reading) = serde_json::from_value::<RegionRecord>(value)
                .ok()
                .and_then(RegionRecord::into_reading)
            else {
                continue;
            };
            heat_points.push(HeatPoint::from_reading(&reading));
            overlays.push(RegionOverlay::from_reading(reading));
        }

        let dropped = received - overlays.len();
        Self {
            window,
            overlays,
            heat_points,
            received,
            dropped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

/// What happened to the displayed state after a poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Updated {
        regions: usize,
        heat_points: usize,
        dropped: usize,
    },
    Retained {
        error: FetchError,
        had_snapshot: bool,
    },
}

/// Last-known-good display snapshot plus cycle counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    current: Option<IntensitySnapshot>,
    updates: u64,
    failures: u64,
}

impl DisplayState {
    pub fn current(&self) -> Option<&IntensitySnapshot> {
        self.current.as_ref()
    }

    pub fn overlays(&self) -> &[RegionOverlay] {
        self.current
            .as_ref()
            .map(|snapshot| snapshot.overlays.as_slice())
            .unwrap_or(&[])
    }

    pub fn heat_points(&self) -> &[HeatPoint] {
        self.current
            .as_ref()
            .map(|snapshot| snapshot.heat_points.as_slice())
            .unwrap_or(&[])
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Success replaces the snapshot; failure leaves it exactly as it was.
    pub fn apply(&mut self, result: Result<IntensitySnapshot, FetchError>) -> PollOutcome {
        match result {
            Ok(snapshot) => {
                let outcome = PollOutcome::Updated {
                    regions: snapshot.overlays.len(),
                    heat_points: snapshot.heat_points.len(),
                    dropped: snapshot.dropped,
                };
                self.current = Some(snapshot);
                self.updates = self.updates.saturating_add(1);
                outcome
            }
            Err(error) => {
                self.failures = self.failures.saturating_add(1);
                PollOutcome::Retained {
                    error,
                    had_snapshot: self.current.is_some(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intensity::IntensityIndex;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        TimeWindow::ending_at(now)
    }

    const LONDON_HIGH: &str = r#"{
        "data": [{
            "from": "2024-05-01T11:30Z",
            "to": "2024-05-01T12:00Z",
            "regions": [{
                "regionid": 13,
                "shortname": "London",
                "latitude": 51.5,
                "longitude": -0.1,
                "intensity": {"forecast": 210, "index": "high"},
                "dataLastUpdated": "2024-05-01T11:45Z"
            }]
        }]
    }"#;

    const MIXED: &str = r#"{
        "data": [{
            "regions": [
                {"regionid": 1, "shortname": "North Scotland", "latitude": 57.5, "longitude": -4.2,
                 "intensity": {"index": "very low"}},
                {"regionid": 2, "shortname": "South Scotland", "longitude": -3.2,
                 "intensity": {"index": "low"}},
                {"regionid": 3, "shortname": "North West England", "latitude": 53.8, "longitude": -2.6,
                 "intensity": {"index": "moderate"}},
                {"regionid": 4, "shortname": "North East England", "latitude": 54.9, "longitude": -1.6},
                {"regionid": 5, "shortname": "Yorkshire", "latitude": "53.9", "longitude": -1.1,
                 "intensity": {"index": "high"}}
            ]
        }, {
            "regions": "ignored"
        }]
    }"#;

    #[test]
    fn single_high_region_yields_heat_point_and_blue_circle() {
        let snapshot = IntensitySnapshot::from_json(window(), LONDON_HIGH).expect("parses");
        assert_eq!(
            snapshot.heat_points,
            vec![HeatPoint {
                lat: 51.5,
                lon: -0.1,
                weight: 200
            }]
        );
        assert_eq!(snapshot.overlays.len(), 1);
        assert_eq!(snapshot.overlays[0].color, OverlayColor::Blue);
        assert_eq!(snapshot.overlays[0].reading.index, IntensityIndex::High);
        assert_eq!(snapshot.received, 1);
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn incomplete_regions_are_excluded_from_both_outputs() {
        let snapshot = IntensitySnapshot::from_json(window(), MIXED).expect("parses");
        let names: Vec<_> = snapshot
            .overlays
            .iter()
            .map(|o| o.reading.short_name.as_str())
            .collect();
        assert_eq!(names, vec!["North Scotland", "North West England"]);
        assert_eq!(
            snapshot.heat_points,
            vec![
                HeatPoint {
                    lat: 57.5,
                    lon: -4.2,
                    weight: 50
                },
                HeatPoint {
                    lat: 53.8,
                    lon: -2.6,
                    weight: 100
                },
            ]
        );
        assert_eq!(snapshot.received, 5);
        assert_eq!(snapshot.dropped, 3);
    }

    #[test]
    fn region_without_latitude_is_dropped() {
        let body = r#"{"data":[{"regions":[
            {"regionid": 9, "shortname": "Somewhere", "longitude": -0.1, "intensity": {"index": "high"}}
        ]}]}"#;
        let snapshot = IntensitySnapshot::from_json(window(), body).expect("parses");
        assert!(snapshot.is_empty());
        assert!(snapshot.heat_points.is_empty());
        assert_eq!(snapshot.dropped, 1);
    }

    #[test]
    fn odd_extra_field_types_keep_the_region() {
        let body = r#"{"data":[{"regions":[
            {"regionid": "13", "shortname": "London", "latitude": 51.5, "longitude": -0.1,
             "intensity": {"forecast": "n/a", "index": "high"}},
            {"regionid": 14, "shortname": 7, "latitude": 50.8, "longitude": -0.4,
             "intensity": {"forecast": 120, "index": "moderate"}},
            {"regionid": 15, "dnoregion": ["SSE"], "shortname": "South England",
             "latitude": 51.1, "longitude": -1.3, "intensity": {"index": "low"},
             "dataLastUpdated": 0}
        ]}]}"#;
        let snapshot = IntensitySnapshot::from_json(window(), body).expect("parses");
        assert_eq!(snapshot.overlays.len(), 3);
        assert_eq!(snapshot.dropped, 0);
        assert_eq!(
            snapshot
                .heat_points
                .iter()
                .map(|p| p.weight)
                .collect::<Vec<_>>(),
            vec![200, 100, 50]
        );
        assert_eq!(snapshot.overlays[0].reading.key(), "London");
        assert_eq!(snapshot.overlays[0].reading.forecast, None);
        assert_eq!(snapshot.overlays[1].reading.short_name, "");
    }

    #[test]
    fn parsing_is_idempotent() {
        let a = IntensitySnapshot::from_json(window(), MIXED).expect("parses");
        let b = IntensitySnapshot::from_json(window(), MIXED).expect("parses");
        assert_eq!(a.overlays, b.overlays);
        assert_eq!(a.heat_points, b.heat_points);
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let cases = [
            "not json",
            "{}",
            r#"{"data": []}"#,
            r#"{"data": [{}]}"#,
            r#"{"data": [{"regions": {}}]}"#,
            r#"{"data": {"regions": []}}"#,
        ];
        for body in cases {
            let err = IntensitySnapshot::from_json(window(), body).expect_err(body);
            assert!(matches!(err, FetchError::Shape(_)), "{body}: {err:?}");
        }
    }

    #[test]
    fn empty_region_list_is_a_valid_snapshot() {
        let snapshot =
            IntensitySnapshot::from_json(window(), r#"{"data":[{"regions":[]}]}"#).expect("parses");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.received, 0);
    }

    #[test]
    fn tooltip_lists_name_intensity_forecast_and_timestamp() {
        let snapshot = IntensitySnapshot::from_json(window(), LONDON_HIGH).expect("parses");
        assert_eq!(
            snapshot.overlays[0].tooltip_lines(),
            vec![
                "London".to_string(),
                "Intensity: high".to_string(),
                "Forecast: 210 gCO2/kWh".to_string(),
                "Timestamp: 2024-05-01T11:45Z".to_string(),
            ]
        );
    }

    #[test]
    fn tooltip_names_the_network_operator() {
        let body = r#"{"data":[{"regions":[
            {"regionid": 13, "dnoregion": "UKPN London", "shortname": "London",
             "latitude": 51.5, "longitude": -0.1, "intensity": {"index": "moderate"}}
        ]}]}"#;
        let snapshot = IntensitySnapshot::from_json(window(), body).expect("parses");
        assert_eq!(
            snapshot.overlays[0].tooltip_lines(),
            vec![
                "London".to_string(),
                "DNO: UKPN London".to_string(),
                "Intensity: moderate".to_string(),
                "Timestamp: unknown".to_string(),
            ]
        );
    }

    #[test]
    fn failed_poll_retains_previous_snapshot() {
        let mut state = DisplayState::default();
        let first = IntensitySnapshot::from_json(window(), MIXED).expect("parses");
        let outcome = state.apply(Ok(first.clone()));
        assert_eq!(
            outcome,
            PollOutcome::Updated {
                regions: 2,
                heat_points: 2,
                dropped: 3
            }
        );

        let outcome = state.apply(Err(FetchError::Network("fetch error: offline".into())));
        assert_eq!(
            outcome,
            PollOutcome::Retained {
                error: FetchError::Network("fetch error: offline".into()),
                had_snapshot: true
            }
        );
        assert_eq!(state.current(), Some(&first));
        assert_eq!(state.heat_points(), first.heat_points.as_slice());
        assert_eq!(state.updates(), 1);
        assert_eq!(state.failures(), 1);
    }

    #[test]
    fn failure_before_first_success_shows_nothing() {
        let mut state = DisplayState::default();
        let outcome = state.apply(Err(FetchError::Status(502)));
        assert_eq!(
            outcome,
            PollOutcome::Retained {
                error: FetchError::Status(502),
                had_snapshot: false
            }
        );
        assert!(state.overlays().is_empty());
        assert!(state.heat_points().is_empty());
    }

    #[test]
    fn success_replaces_rather_than_merges() {
        let mut state = DisplayState::default();
        state.apply(IntensitySnapshot::from_json(window(), MIXED));
        state.apply(IntensitySnapshot::from_json(window(), LONDON_HIGH));
        assert_eq!(state.overlays().len(), 1);
        assert_eq!(state.overlays()[0].reading.short_name, "London");
        assert_eq!(state.updates(), 2);
    }
}
