use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors surfaced by the parse pipeline. Validation failures are not
/// errors; they are reported through [`ValidationOutcome`].
#[derive(Debug, Error)]
pub enum FitDecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode FIT data: {0}")]
    Format(String),
    #[error("FIT file decoded to zero messages")]
    Empty,
    #[error("failed to write JSON export to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Limits applied before a file is handed to the decoder. Passed per call so
/// concurrent parses can run with different caps.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub max_size_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

/// Result of the pre-flight checks: a verdict plus a user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Sport category of an activity, mapped from the FIT `sport` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ActivityType {
    #[default]
    Run,
    Ride,
    Walk,
    Hike,
    Swim,
    Workout,
}

impl ActivityType {
    /// Case-insensitive lookup over the small FIT sport vocabulary. Sports
    /// outside the table (and absent sport fields) fall back to `Run`.
    pub fn from_sport(sport: Option<&str>) -> Self {
        match sport.map(str::to_ascii_lowercase).as_deref() {
            Some("running") => Self::Run,
            Some("cycling") => Self::Ride,
            Some("walking") => Self::Walk,
            Some("hiking") => Self::Hike,
            Some("swimming") => Self::Swim,
            Some("generic") => Self::Workout,
            _ => Self::Run,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Run => "Run",
            Self::Ride => "Ride",
            Self::Walk => "Walk",
            Self::Hike => "Hike",
            Self::Swim => "Swim",
            Self::Workout => "Workout",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One sampled instant from a `record` message. Every field is optional;
/// which ones are present depends on the sensors the device carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsSamplePoint {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_opt_iso_utc"
    )]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
}

impl GpsSamplePoint {
    pub fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.lat.is_none()
            && self.lng.is_none()
            && self.altitude.is_none()
            && self.distance.is_none()
            && self.speed.is_none()
            && self.heartrate.is_none()
            && self.cadence.is_none()
            && self.watts.is_none()
            && self.temp.is_none()
            && self.grade.is_none()
    }
}

/// One lap boundary from a `lap` message, 1-based sequence id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lap {
    pub id: u32,
    pub name: String,
    pub elapsed_time: f64,
    pub moving_time: f64,
    pub distance: f64,
    pub average_speed: f64,
    pub max_speed: f64,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub total_elevation_gain: f64,
    pub calories: f64,
    pub intensity: String,
    pub lap_trigger: String,
    #[serde(serialize_with = "ser_opt_iso_utc")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(serialize_with = "ser_opt_iso_utc")]
    pub end_time: Option<DateTime<Utc>>,
}

/// A named, device- or course-defined portion of the activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub id: u32,
    pub name: String,
    pub elapsed_time: f64,
    pub distance: f64,
    pub average_speed: f64,
    #[serde(serialize_with = "ser_opt_iso_utc")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(serialize_with = "ser_opt_iso_utc")]
    pub end_time: Option<DateTime<Utc>>,
}

/// A fixed-distance bucket computed from the GPS track, never read from the
/// file itself. Rebuilt from scratch on every parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    pub split: u32,
    pub distance: f64,
    pub elapsed_time: f64,
    pub moving_time: f64,
    pub average_speed: f64,
    pub elevation_difference: f64,
    pub average_heartrate: Option<f64>,
    pub pace_zone: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoneRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityZones {
    pub heart_rate: Vec<ZoneRange>,
    pub power: Vec<ZoneRange>,
}

/// The normalized activity summary: the shape the rest of the application
/// consumes. Aggregates that depend on optional sensors stay `None`, with
/// `has_heartrate`/`has_power` signalling presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedActivity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub start_date: Option<String>,
    pub start_date_local: Option<String>,
    pub distance: f64,
    pub moving_time: f64,
    pub elapsed_time: f64,
    pub total_elevation_gain: f64,
    pub elev_high: Option<f64>,
    pub elev_low: Option<f64>,
    pub average_speed: f64,
    pub max_speed: f64,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub weighted_average_watts: Option<f64>,
    pub average_temp: Option<f64>,
    pub has_heartrate: bool,
    pub has_power: bool,
    pub calories: f64,
    pub splits_standard: Vec<Split>,
    pub splits_metric: Vec<Split>,
    pub laps: Vec<Lap>,
    pub segments: Vec<Segment>,
    pub gps_track: Vec<GpsSamplePoint>,
    pub device_name: Option<String>,
    pub device_manufacturer: Option<String>,
    pub zones: ActivityZones,
    pub manual: bool,
    pub description: String,
}

impl Default for NormalizedActivity {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "Manual FIT Upload".to_string(),
            activity_type: ActivityType::Run,
            start_date: None,
            start_date_local: None,
            distance: 0.0,
            moving_time: 0.0,
            elapsed_time: 0.0,
            total_elevation_gain: 0.0,
            elev_high: None,
            elev_low: None,
            average_speed: 0.0,
            max_speed: 0.0,
            average_heartrate: None,
            max_heartrate: None,
            average_cadence: None,
            average_watts: None,
            max_watts: None,
            weighted_average_watts: None,
            average_temp: None,
            has_heartrate: false,
            has_power: false,
            calories: 0.0,
            splits_standard: Vec::new(),
            splits_metric: Vec::new(),
            laps: Vec::new(),
            segments: Vec::new(),
            gps_track: Vec::new(),
            device_name: None,
            device_manufacturer: None,
            zones: ActivityZones::default(),
            manual: true,
            description: "Uploaded from FIT file".to_string(),
        }
    }
}

impl NormalizedActivity {
    /// Laps representing work intervals, excluding rest/recovery laps.
    pub fn intervals(&self) -> Vec<&Lap> {
        self.laps
            .iter()
            .filter(|lap| lap.intensity.eq_ignore_ascii_case("active"))
            .collect()
    }
}

/// ISO-8601 with an explicit UTC designator, e.g. `2023-11-14T22:13:20Z`.
pub(crate) fn iso_utc(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Same instant without the designator, the "local" rendering.
pub(crate) fn iso_local(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub(crate) fn ser_opt_iso_utc<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(timestamp) => serializer.serialize_str(&iso_utc(timestamp)),
        None => serializer.serialize_none(),
    }
}
