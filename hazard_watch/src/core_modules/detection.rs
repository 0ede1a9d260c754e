// THEORY:
// The `detection` module holds the single entity of the system: a `HazardDetection`.
// It is a "dumb" data container describing one simulated observation of a road
// hazard at a point in space and time. Everything above it (generator, store,
// filters, analytics, pages) only reads or produces these records.
//
// Key principles:
// 1.  **Closed Type Set**: `HazardType` is an enum, so a detection can never carry a
//     type outside the six known hazards. Its JSON spelling is the human label
//     ("Speed Breaker"), which is also what the filter compares against.
// 2.  **Plain Numbers**: Scores are `f64` in [0, 1) and timestamps are milliseconds
//     since the Unix epoch, so age arithmetic is a subtraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six hazard kinds the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardType {
    Pothole,
    #[serde(rename = "Speed Breaker")]
    SpeedBreaker,
    Debris,
    #[serde(rename = "Stalled Vehicle")]
    StalledVehicle,
    Crack,
    Animal,
}

impl HazardType {
    /// Every member of the closed set, in display order.
    pub const ALL: [HazardType; 6] = [
        HazardType::Pothole,
        HazardType::SpeedBreaker,
        HazardType::Debris,
        HazardType::StalledVehicle,
        HazardType::Crack,
        HazardType::Animal,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HazardType::Pothole => "Pothole",
            HazardType::SpeedBreaker => "Speed Breaker",
            HazardType::Debris => "Debris",
            HazardType::StalledVehicle => "Stalled Vehicle",
            HazardType::Crack => "Crack",
            HazardType::Animal => "Animal",
        }
    }

    /// The theme colour slot used to tint cards and chart slices for this type.
    pub fn color(self) -> &'static str {
        match self {
            HazardType::Pothole => "hsl(var(--hazard-pothole))",
            HazardType::SpeedBreaker => "hsl(var(--hazard-speed-breaker))",
            HazardType::Debris => "hsl(var(--hazard-debris))",
            HazardType::StalledVehicle => "hsl(var(--hazard-vehicle))",
            HazardType::Crack => "hsl(var(--hazard-crack))",
            HazardType::Animal => "hsl(var(--hazard-animal))",
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string names none of the six hazard types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHazardType(pub String);

impl fmt::Display for UnknownHazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown hazard type '{}'", self.0)
    }
}

impl std::error::Error for UnknownHazardType {}

impl FromStr for HazardType {
    type Err = UnknownHazardType;

    /// Case-insensitive match against the display labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        HazardType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownHazardType(s.to_string()))
    }
}

/// A single simulated hazard observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDetection {
    /// Session-unique sequence number, assigned by the generator that produced it.
    pub id: u64,
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    pub lat: f64,
    pub lon: f64,
    /// Synthetic model confidence in [0.6, 1.0).
    pub confidence: f64,
    /// Normalised severity in [0.0, 1.0).
    pub severity: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl HazardDetection {
    /// Age in milliseconds relative to `now_ms`. Negative for detections stamped in the future.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    /// Confidence as a whole percentage, the way cards and notices print it.
    pub fn confidence_percent(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }

    /// Wall-clock time of the detection (UTC, `HH:MM:SS`).
    pub fn time_of_day(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string())
    }

    /// Full date and time of the detection (UTC), used by map popups.
    pub fn date_time(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
