//! JSON export of a (filtered) detection list.

use crate::core_modules::detection::HazardDetection;
use crate::error::HazardResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name every export is saved under.
pub const EXPORT_FILE_NAME: &str = "road_hazard_data.json";

/// Pretty-printed JSON array, two-space indented.
pub fn to_json(detections: &[HazardDetection]) -> HazardResult<String> {
    Ok(serde_json::to_string_pretty(detections)?)
}

pub fn from_json(json: &str) -> HazardResult<Vec<HazardDetection>> {
    Ok(serde_json::from_str(json)?)
}

/// Writes `detections` to `<dir>/road_hazard_data.json`, replacing any earlier export.
pub fn write_export(dir: &Path, detections: &[HazardDetection]) -> HazardResult<PathBuf> {
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, to_json(detections)?)?;
    info!(path = %path.display(), count = detections.len(), "exported detections");
    Ok(path)
}
