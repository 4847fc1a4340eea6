use chrono::{Datelike, NaiveDate};
use pano_core::Coordinate;
use serde::{Deserialize, Serialize};

use crate::config::IngestConfig;

/// Column header written at the top of every capture table
pub const TABLE_HEADER: [&str; 9] = [
    "origin_lat",
    "origin_lon",
    "origin_timestamp",
    "sample_lat",
    "sample_lon",
    "record_id",
    "capture_date",
    "attribution",
    "status",
];

/// One row of a capture table, exactly as read
///
/// Every field is optional text; validation happens in [`RawRecord::validate`].
/// Older tables use the collection tool's earlier column names, accepted
/// through aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(alias = "query_lat")]
    pub origin_lat: Option<String>,
    #[serde(alias = "query_lon")]
    pub origin_lon: Option<String>,
    #[serde(alias = "query_timestamp")]
    pub origin_timestamp: Option<String>,
    #[serde(alias = "pano_lat")]
    pub sample_lat: Option<String>,
    #[serde(alias = "pano_lon")]
    pub sample_lon: Option<String>,
    #[serde(alias = "pano_id")]
    pub record_id: Option<String>,
    pub capture_date: Option<String>,
    #[serde(alias = "copyright_info")]
    pub attribution: Option<String>,
    pub status: Option<String>,
}

/// A record that passed the status, attribution, date, coordinate and
/// identifier checks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidRecord {
    pub record_id: String,
    pub origin: Option<Coordinate>,
    pub sample: Coordinate,
    pub capture_date: NaiveDate,
    pub attribution: String,
}

impl ValidRecord {
    pub fn year(&self) -> i32 {
        self.capture_date.year()
    }

    /// Day-granularity key used by the temporal aggregate
    pub fn date_key(&self) -> String {
        format_date_key(self.capture_date)
    }
}

/// Why a row was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SkipReason {
    /// The row could not be read as a record at all
    Malformed,
    /// Status differs from the success sentinel
    Status,
    /// Attribution missing or from another source
    Attribution,
    /// Capture date missing or not a calendar date
    CaptureDate,
    /// Sample coordinate missing or not numeric
    Coordinates,
    /// Identifier missing
    MissingId,
}

impl RawRecord {
    /// Apply the validity filter
    pub fn validate(self, config: &IngestConfig) -> Result<ValidRecord, SkipReason> {
        let nulls = &config.null_config;

        match nulls.present(self.status.as_deref()) {
            Some(status) if status == config.success_status => {}
            _ => return Err(SkipReason::Status),
        }

        let attribution = match nulls.present(self.attribution.as_deref()) {
            Some(a) if a.contains(config.required_attribution.as_str()) => a.to_string(),
            _ => return Err(SkipReason::Attribution),
        };

        let capture_date = nulls
            .present(self.capture_date.as_deref())
            .and_then(parse_capture_date)
            .ok_or(SkipReason::CaptureDate)?;

        let sample = parse_coordinate(
            nulls.present(self.sample_lat.as_deref()),
            nulls.present(self.sample_lon.as_deref()),
        )
        .ok_or(SkipReason::Coordinates)?;

        let record_id = nulls
            .present(self.record_id.as_deref())
            .ok_or(SkipReason::MissingId)?
            .to_string();

        let origin = parse_coordinate(
            nulls.present(self.origin_lat.as_deref()),
            nulls.present(self.origin_lon.as_deref()),
        );

        Ok(ValidRecord {
            record_id,
            origin,
            sample,
            capture_date,
            attribution,
        })
    }
}

/// Parse a capture date
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM` (first of the month) and timestamps whose
/// first ten characters are `YYYY-MM-DD`.
pub fn parse_capture_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if value.len() == 7 {
        return NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok();
    }
    value
        .get(..10)
        .filter(|_| value.len() > 10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// Format a date the way aggregate keys are written
pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_coordinate(lat: Option<&str>, lon: Option<&str>) -> Option<Coordinate> {
    let lat = lat?.parse::<f64>().ok()?;
    let lon = lon?.parse::<f64>().ok()?;
    let coordinate = Coordinate::new(lat, lon);
    coordinate.is_valid().then_some(coordinate)
}
