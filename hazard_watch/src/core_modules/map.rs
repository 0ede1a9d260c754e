//! View model for the hazard map: markers for detections, the fixed landmark
//! layer, and the tile provider the page points its map widget at.

use crate::core_modules::analytics::SeverityBand;
use crate::core_modules::detection::{HazardDetection, HazardType};
use serde::Serialize;

pub const MAP_CENTER: (f64, f64) = (12.9716, 77.5946);
pub const MAP_ZOOM: u8 = 14;
pub const TILE_URL_TEMPLATE: &str =
    "https://tiles.stadiamaps.com/tiles/alidade_smooth_dark/{z}/{x}/{y}{r}.png";
pub const TILE_ATTRIBUTION: &str = "Map data © OpenStreetMap";

pub fn icon_url(hazard_type: HazardType) -> &'static str {
    match hazard_type {
        HazardType::Pothole => "https://cdn-icons-png.flaticon.com/512/3176/3176299.png",
        HazardType::SpeedBreaker => "https://cdn-icons-png.flaticon.com/512/252/252025.png",
        HazardType::Debris => "https://cdn-icons-png.flaticon.com/512/3125/3125713.png",
        HazardType::StalledVehicle => "https://cdn-icons-png.flaticon.com/512/744/744465.png",
        HazardType::Crack => "https://cdn-icons-png.flaticon.com/512/201/201623.png",
        HazardType::Animal => "https://cdn-icons-png.flaticon.com/512/616/616408.png",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LandmarkKind {
    Hospital,
    PoliceStation,
    PetrolPump,
}

impl LandmarkKind {
    pub fn label(self) -> &'static str {
        match self {
            LandmarkKind::Hospital => "Hospital",
            LandmarkKind::PoliceStation => "Police Station",
            LandmarkKind::PetrolPump => "Petrol Pump",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            LandmarkKind::Hospital => "🏥",
            LandmarkKind::PoliceStation => "🚓",
            LandmarkKind::PetrolPump => "⛽",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Landmark {
    pub name: &'static str,
    pub kind: LandmarkKind,
    pub lat: f64,
    pub lon: f64,
}

pub const LANDMARKS: [Landmark; 3] = [
    Landmark { name: "Apollo Hospital", kind: LandmarkKind::Hospital, lat: 12.9712, lon: 77.5949 },
    Landmark { name: "Indiranagar Police", kind: LandmarkKind::PoliceStation, lat: 12.976, lon: 77.599 },
    Landmark { name: "HP Petrol Pump", kind: LandmarkKind::PetrolPump, lat: 12.9685, lon: 77.591 },
];

/// A detection as the map draws it: an icon, a severity circle and a popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub tooltip: &'static str,
    pub icon_url: &'static str,
    pub severity_color: &'static str,
    pub popup: Vec<String>,
}

impl MapMarker {
    pub fn from_detection(detection: &HazardDetection) -> Self {
        Self {
            id: detection.id,
            lat: detection.lat,
            lon: detection.lon,
            tooltip: detection.hazard_type.label(),
            icon_url: icon_url(detection.hazard_type),
            severity_color: SeverityBand::of(detection.severity).color(),
            popup: vec![
                detection.hazard_type.label().to_string(),
                format!("Confidence: {:.1}%", detection.confidence * 100.0),
                format!("Severity: {:.0}%", detection.severity * 100.0),
                format!("Time: {}", detection.date_time()),
            ],
        }
    }
}

/// Everything the map widget needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayers {
    pub center: (f64, f64),
    pub zoom: u8,
    pub tile_url: &'static str,
    pub markers: Vec<MapMarker>,
    /// Empty when the landmark layer is switched off.
    pub landmarks: Vec<Landmark>,
}

impl MapLayers {
    pub fn build(detections: &[HazardDetection], show_landmarks: bool) -> Self {
        Self {
            center: MAP_CENTER,
            zoom: MAP_ZOOM,
            tile_url: TILE_URL_TEMPLATE,
            markers: detections.iter().map(MapMarker::from_detection).collect(),
            landmarks: if show_landmarks { LANDMARKS.to_vec() } else { Vec::new() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::fixtures::sample_detections;

    #[test]
    fn one_marker_per_detection_with_severity_colour() {
        let fixture = sample_detections(1_760_000_000_000);
        let layers = MapLayers::build(&fixture, true);
        assert_eq!(layers.markers.len(), 5);
        assert_eq!(layers.landmarks.len(), 3);
        let pothole = &layers.markers[0];
        assert_eq!(pothole.severity_color, "#ff4d4f");
        assert_eq!(pothole.popup[1], "Confidence: 93.0%");
        assert_eq!(pothole.popup[2], "Severity: 80%");
        let debris = &layers.markers[2];
        assert_eq!(debris.severity_color, "#52c41a");
        assert_eq!(debris.icon_url, icon_url(HazardType::Debris));
    }

    #[test]
    fn landmarks_can_be_hidden() {
        let layers = MapLayers::build(&[], false);
        assert!(layers.landmarks.is_empty());
        assert!(layers.markers.is_empty());
        assert_eq!(layers.center, MAP_CENTER);
    }
}
