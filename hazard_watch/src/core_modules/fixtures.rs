//! The five sample detections every dashboard session starts with, and the
//! image pool the generator borrows from.

use crate::core_modules::detection::{HazardDetection, HazardType};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Sample road images shared by the fixture and the generator.
pub const SAMPLE_IMAGE_URLS: [&str; 5] = [
    "https://images.unsplash.com/photo-1449844908441-8829872d2607?w=400",
    "https://images.unsplash.com/photo-1486312338219-ce68d2c6f44d?w=400",
    "https://images.unsplash.com/photo-1581091226825-a6a2a5aee158?w=400",
    "https://images.unsplash.com/photo-1498050108023-c5249f4df085?w=400",
    "https://images.unsplash.com/photo-1461749280684-dccba630e2f6?w=400",
];

/// Number of records in [`sample_detections`]; generated ids start right after it.
pub const SAMPLE_COUNT: u64 = 5;

/// Fixed detections aged 5 min, 30 min, 2 h, 26 h and 10 min relative to `now_ms`.
pub fn sample_detections(now_ms: i64) -> Vec<HazardDetection> {
    let rows = [
        (1, HazardType::Pothole, 0.93, 0.8, 12.9716, 77.5946, 5 * MINUTE_MS),
        (2, HazardType::SpeedBreaker, 0.87, 0.5, 12.9720, 77.5951, 30 * MINUTE_MS),
        (3, HazardType::Debris, 0.91, 0.4, 12.9710, 77.5940, 2 * HOUR_MS),
        (4, HazardType::StalledVehicle, 0.89, 0.7, 12.9725, 77.5955, 26 * HOUR_MS),
        (5, HazardType::Pothole, 0.95, 0.9, 12.9705, 77.5935, 10 * MINUTE_MS),
    ];

    rows.into_iter()
        .zip(SAMPLE_IMAGE_URLS)
        .map(
            |((id, hazard_type, confidence, severity, lat, lon, age), url)| HazardDetection {
                id,
                hazard_type,
                lat,
                lon,
                confidence,
                severity,
                timestamp: now_ms - age,
                image_url: Some(url.to_string()),
            },
        )
        .collect()
}
