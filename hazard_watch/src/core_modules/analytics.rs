// THEORY:
// The `analytics` module aggregates a list of detections into the numbers the
// analytics page charts: headline totals, a per-type breakdown, a confidence
// histogram, a time-of-day series and severity bands. Like the filter, it is a
// pure function of its input and never fails; an empty input yields zeros.

use crate::core_modules::detection::{HazardDetection, HazardType};
use crate::core_modules::filter::TypeCounts;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

const HISTOGRAM_FLOOR_PERCENT: u32 = 60;
const HISTOGRAM_BIN_PERCENT: u32 = 5;
const HISTOGRAM_BINS: usize = 8;
const SERIES_BUCKET_HOURS: u32 = 4;
const SERIES_BUCKETS: usize = 6;

/// Coarse severity classes, shared by map circles and the analytics breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeverityBand {
    Low,
    Medium,
    High,
}

impl SeverityBand {
    pub const ALL: [SeverityBand; 3] = [SeverityBand::Low, SeverityBand::Medium, SeverityBand::High];

    /// Above 0.7 is high, above 0.4 medium, everything else low.
    pub fn of(severity: f64) -> Self {
        if severity > 0.7 {
            SeverityBand::High
        } else if severity > 0.4 {
            SeverityBand::Medium
        } else {
            SeverityBand::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            SeverityBand::High => "#ff4d4f",
            SeverityBand::Medium => "#faad14",
            SeverityBand::Low => "#52c41a",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityBand::High => "High",
            SeverityBand::Medium => "Medium",
            SeverityBand::Low => "Low",
        }
    }
}

/// One bar of the confidence histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfidenceBin {
    /// Human range, e.g. `"90-95%"`.
    pub range: String,
    pub count: usize,
}

/// One point of the detections-over-time line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    /// Bucket start as `HH:00` (UTC hour of day).
    pub time: String,
    pub detections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    /// Mean confidence in [0, 1); zero for an empty input.
    pub average_confidence: f64,
    /// Mean severity in [0, 1); zero for an empty input.
    pub average_severity: f64,
    pub by_type: TypeCounts,
    pub confidence_histogram: Vec<ConfidenceBin>,
    pub over_time: Vec<TimeBucket>,
    pub severity_bands: Vec<(SeverityBand, usize)>,
}

impl AnalyticsSummary {
    pub fn compute(detections: &[HazardDetection]) -> Self {
        let total = detections.len();
        let mean = |f: fn(&HazardDetection) -> f64| {
            if total == 0 {
                0.0
            } else {
                detections.iter().map(f).sum::<f64>() / total as f64
            }
        };

        let mut histogram = [0usize; HISTOGRAM_BINS];
        let mut series = [0usize; SERIES_BUCKETS];
        let mut bands = [0usize; 3];

        for detection in detections {
            histogram[confidence_bin(detection.confidence)] += 1;
            if let Some(bucket) = time_bucket(detection.timestamp) {
                series[bucket] += 1;
            }
            let band = SeverityBand::of(detection.severity);
            bands[SeverityBand::ALL.iter().position(|b| *b == band).unwrap_or(0)] += 1;
        }

        Self {
            total,
            average_confidence: mean(|d| d.confidence),
            average_severity: mean(|d| d.severity),
            by_type: TypeCounts::tally(detections),
            confidence_histogram: histogram
                .iter()
                .enumerate()
                .map(|(i, count)| {
                    let lo = HISTOGRAM_FLOOR_PERCENT + i as u32 * HISTOGRAM_BIN_PERCENT;
                    ConfidenceBin {
                        range: format!("{}-{}%", lo, lo + HISTOGRAM_BIN_PERCENT),
                        count: *count,
                    }
                })
                .collect(),
            over_time: series
                .iter()
                .enumerate()
                .map(|(i, count)| TimeBucket {
                    time: format!("{:02}:00", i as u32 * SERIES_BUCKET_HOURS),
                    detections: *count,
                })
                .collect(),
            severity_bands: SeverityBand::ALL.into_iter().zip(bands).collect(),
        }
    }

    /// The per-type breakdown restricted to types that occur, for the pie chart.
    pub fn present_types(&self) -> Vec<(HazardType, usize)> {
        self.by_type.by_type.iter().copied().filter(|(_, n)| *n > 0).collect()
    }
}

/// Confidences below 60 % land in the first bin and 100 % in the last.
fn confidence_bin(confidence: f64) -> usize {
    let percent = (confidence * 100.0).max(HISTOGRAM_FLOOR_PERCENT as f64);
    let bin = ((percent - HISTOGRAM_FLOOR_PERCENT as f64) / HISTOGRAM_BIN_PERCENT as f64) as usize;
    bin.min(HISTOGRAM_BINS - 1)
}

fn time_bucket(timestamp_ms: i64) -> Option<usize> {
    let hour = DateTime::<Utc>::from_timestamp_millis(timestamp_ms)?.hour();
    Some((hour / SERIES_BUCKET_HOURS) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::fixtures::sample_detections;

    // 2025-10-09 08:53:20 UTC
    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn empty_input_is_all_zero() {
        let summary = AnalyticsSummary::compute(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_confidence, 0.0);
        assert_eq!(summary.confidence_histogram.len(), 8);
        assert!(summary.confidence_histogram.iter().all(|b| b.count == 0));
        assert_eq!(summary.over_time.len(), 6);
        assert_eq!(summary.over_time[0].time, "00:00");
        assert_eq!(summary.over_time[5].time, "20:00");
    }

    #[test]
    fn summarises_fixture() {
        let fixture = sample_detections(NOW);
        let summary = AnalyticsSummary::compute(&fixture);
        assert_eq!(summary.total, 5);
        assert!((summary.average_confidence - 0.91).abs() < 1e-9);
        assert_eq!(summary.by_type.count(HazardType::Pothole), 2);

        let bins: Vec<usize> = summary.confidence_histogram.iter().map(|b| b.count).collect();
        // 0.87 and 0.89 in 85-90, 0.91 and 0.93 in 90-95, 0.95 in 95-100.
        assert_eq!(bins, vec![0, 0, 0, 0, 0, 2, 2, 1]);
        assert_eq!(summary.confidence_histogram[7].range, "95-100%");

        let bands: Vec<usize> = summary.severity_bands.iter().map(|(_, n)| *n).collect();
        // Low: 0.4; Medium: 0.5, 0.7; High: 0.8, 0.9.
        assert_eq!(bands, vec![1, 2, 2]);

        assert_eq!(summary.over_time.iter().map(|b| b.detections).sum::<usize>(), 5);
        assert_eq!(summary.present_types().len(), 4);
    }

    #[test]
    fn severity_band_edges() {
        assert_eq!(SeverityBand::of(0.4), SeverityBand::Low);
        assert_eq!(SeverityBand::of(0.41), SeverityBand::Medium);
        assert_eq!(SeverityBand::of(0.7), SeverityBand::Medium);
        assert_eq!(SeverityBand::of(0.71), SeverityBand::High);
        assert_eq!(SeverityBand::High.color(), "#ff4d4f");
    }

    #[test]
    fn confidence_bins_clamp() {
        assert_eq!(confidence_bin(0.1), 0);
        assert_eq!(confidence_bin(0.6), 0);
        assert_eq!(confidence_bin(0.999), 7);
        assert_eq!(confidence_bin(1.0), 7);
    }
}
