use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::intensity::IntensityIndex;

/// One region entry exactly as the intensity API delivers it. Every field is
/// optional here, and a field of the wrong JSON type reads as absent;
/// `into_reading` decides whether the entry is usable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionRecord {
    #[serde(default, rename = "regionid", deserialize_with = "lenient")]
    pub region_id: Option<i64>,
    #[serde(default, rename = "dnoregion", deserialize_with = "lenient")]
    pub dno_region: Option<String>,
    #[serde(default, rename = "shortname", deserialize_with = "lenient")]
    pub short_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub intensity: Option<IntensityRecord>,
    #[serde(default, rename = "dataLastUpdated", deserialize_with = "lenient")]
    pub data_last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntensityRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub forecast: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub index: Option<IntensityIndex>,
}

/// Reads any JSON value and keeps it only if it converts to `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A region that can be placed on the map: it has a position and a
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionReading {
    pub region_id: Option<i64>,
    pub short_name: String,
    pub dno_region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub index: IntensityIndex,
    /// gCO2/kWh, when the feed includes it.
    pub forecast: Option<f64>,
    pub last_updated: Option<String>,
}

impl RegionRecord {
    /// Returns `None` when latitude, longitude or the intensity index is absent.
    pub fn into_reading(self) -> Option<RegionReading> {
        let latitude = self.latitude?;
        let longitude = self.longitude?;
        let intensity = self.intensity?;
        let index = intensity.index?;
        Some(RegionReading {
            region_id: self.region_id,
            short_name: self.short_name.unwrap_or_default(),
            dno_region: self.dno_region,
            latitude,
            longitude,
            index,
            forecast: intensity.forecast,
            last_updated: self.data_last_updated,
        })
    }
}

impl RegionReading {
    /// Stable key for hit-testing and diffing. Falls back to the short name,
    /// then to the position.
    pub fn key(&self) -> String {
        match self.region_id {
            Some(id) => id.to_string(),
            None if !self.short_name.is_empty() => self.short_name.clone(),
            None => format!("{:.4},{:.4}", self.latitude, self.longitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> RegionRecord {
        serde_json::from_str(json).expect("record should parse")
    }

    #[test]
    fn complete_record_becomes_reading() {
        let reading = record(
            r#"{"regionid":13,"dnoregion":"UKPN London","shortname":"London",
                "latitude":51.5,"longitude":-0.1,
                "intensity":{"forecast":182,"index":"high"},
                "dataLastUpdated":"2024-05-01T12:00Z"}"#,
        )
        .into_reading()
        .expect("reading");
        assert_eq!(reading.region_id, Some(13));
        assert_eq!(reading.short_name, "London");
        assert_eq!(reading.dno_region.as_deref(), Some("UKPN London"));
        assert_eq!(reading.index, IntensityIndex::High);
        assert_eq!(reading.forecast, Some(182.0));
        assert_eq!(reading.last_updated.as_deref(), Some("2024-05-01T12:00Z"));
        assert_eq!(reading.key(), "13");
    }

    #[test]
    fn missing_position_or_index_is_rejected() {
        let no_lat = record(r#"{"longitude":-0.1,"intensity":{"index":"low"}}"#);
        assert!(no_lat.into_reading().is_none());

        let no_lon = record(r#"{"latitude":51.5,"intensity":{"index":"low"}}"#);
        assert!(no_lon.into_reading().is_none());

        let no_intensity = record(r#"{"latitude":51.5,"longitude":-0.1}"#);
        assert!(no_intensity.into_reading().is_none());

        let no_index = record(r#"{"latitude":51.5,"longitude":-0.1,"intensity":{"forecast":90}}"#);
        assert!(no_index.into_reading().is_none());
    }

    #[test]
    fn null_counts_as_absent() {
        let r = record(r#"{"latitude":null,"longitude":-0.1,"intensity":{"index":"low"}}"#);
        assert!(r.into_reading().is_none());
    }

    #[test]
    fn mistyped_optional_fields_read_as_absent() {
        let reading = record(
            r#"{"regionid":"13","dnoregion":false,"shortname":7,
                "latitude":51.5,"longitude":-0.1,
                "intensity":{"forecast":"n/a","index":"high"},
                "dataLastUpdated":1714564800}"#,
        )
        .into_reading()
        .expect("reading");
        assert_eq!(reading.region_id, None);
        assert_eq!(reading.dno_region, None);
        assert_eq!(reading.short_name, "");
        assert_eq!(reading.forecast, None);
        assert_eq!(reading.last_updated, None);
        assert_eq!(reading.index, IntensityIndex::High);
        assert_eq!(reading.key(), "51.5000,-0.1000");
    }

    #[test]
    fn mistyped_position_or_index_is_rejected() {
        let string_lat = record(r#"{"latitude":"51.5","longitude":-0.1,"intensity":{"index":"low"}}"#);
        assert!(string_lat.into_reading().is_none());

        let numeric_index = record(r#"{"latitude":51.5,"longitude":-0.1,"intensity":{"index":3}}"#);
        assert!(numeric_index.into_reading().is_none());

        let scalar_intensity = record(r#"{"latitude":51.5,"longitude":-0.1,"intensity":"high"}"#);
        assert!(scalar_intensity.into_reading().is_none());
    }

    #[test]
    fn key_falls_back_to_short_name() {
        let reading = record(
            r#"{"shortname":"North Wales","latitude":53.0,"longitude":-3.6,"intensity":{"index":"low"}}"#,
        )
        .into_reading()
        .expect("reading");
        assert_eq!(reading.key(), "North Wales");
    }
}
