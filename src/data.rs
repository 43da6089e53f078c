//! Data source - markers and visits loaded once at start-up
//!
//! `markers.json` holds the points of interest, `visits.json` the dated visit
//! events. Both are plain JSON arrays; presentation-only fields on visits are
//! ignored here.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A visit date that could not be parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Malformed visit date '{date}' for marker '{marker_id}'")]
pub struct DateError {
    pub marker_id: MarkerId,
    pub date: String,
}

/// Stable marker identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A point on the layout plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// One point of interest as supplied by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    pub id: MarkerId,
    pub longitude: f64,
    pub latitude: f64,
    pub category: String,
    pub display_name: String,
    #[serde(default)]
    pub region: String,
}

/// One visit event; only the fields the core needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub marker_id: MarkerId,
    pub date: String,
}

impl Visit {
    pub fn new(marker_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            marker_id: MarkerId::new(marker_id),
            date: date.into(),
        }
    }

    /// Parse the visit date into a comparable timestamp
    pub fn timestamp(&self) -> Result<NaiveDateTime, DateError> {
        parse_visit_date(&self.date).ok_or_else(|| DateError {
            marker_id: self.marker_id.clone(),
            date: self.date.clone(),
        })
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.fff]`
pub fn parse_visit_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// A marker after projection and layout
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub record: MarkerRecord,
    pub radius: f64,
    /// Undisplaced projected point
    pub anchor: Point,
    /// Collision-adjusted point
    pub position: Point,
    pub first_visit: Option<NaiveDateTime>,
}

impl Marker {
    pub fn id(&self) -> &MarkerId {
        &self.record.id
    }
}

/// Everything the data source supplies
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub markers: Vec<MarkerRecord>,
    pub visits: Vec<Visit>,
}

impl Dataset {
    /// Load `markers.json` and `visits.json` from a data directory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, DataError> {
        let dir = dir.as_ref();
        let markers: Vec<MarkerRecord> = read_json(&dir.join("markers.json"))?;
        let visits: Vec<Visit> = read_json(&dir.join("visits.json"))?;
        tracing::info!(
            "Loaded {} markers and {} visits from {:?}",
            markers.len(),
            visits.len(),
            dir
        );
        Ok(Self { markers, visits })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_only() {
        let ts = parse_visit_date("2021-05-01").unwrap();
        assert_eq!(ts.to_string(), "2021-05-01 00:00:00");
    }

    #[test]
    fn test_parse_date_time_variants() {
        assert!(parse_visit_date("2021-05-01T10:30:00Z").is_some());
        assert!(parse_visit_date("2021-05-01T10:30:00+02:00").is_some());
        assert!(parse_visit_date("2021-05-01T10:30:00").is_some());
        assert!(parse_visit_date("2021-05-01T10:30:00.250").is_some());
    }

    #[test]
    fn test_malformed_date() {
        let visit = Visit::new("yose", "May 1st");
        let err = visit.timestamp().unwrap_err();
        assert_eq!(err.marker_id.as_str(), "yose");
        assert!(parse_visit_date("2021-13-01").is_none());
    }

    #[test]
    fn test_visit_ignores_presentation_fields() {
        let json = r#"[{"markerId": "zion", "date": "2020-01-01", "photo": "a.jpg", "caption": "x"}]"#;
        let visits: Vec<Visit> = serde_json::from_str(json).unwrap();
        assert_eq!(visits[0].marker_id, MarkerId::from("zion"));
    }

    #[test]
    fn test_marker_record_camel_case() {
        let json = r#"{"id": "acad", "longitude": -68.2, "latitude": 44.3,
            "category": "park", "displayName": "Acadia"}"#;
        let record: MarkerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.display_name, "Acadia");
        assert_eq!(record.region, "");
    }
}
