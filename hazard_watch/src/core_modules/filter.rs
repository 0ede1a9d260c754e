// THEORY:
// The `filter` module is the Filter/Aggregate View. It is a stateless utility:
// given a sequence of detections, a set of `FilterParams` and the current time, it
// returns the subsequence that passes three ANDed predicates (type, severity,
// recency) in the order it was given, plus per-type counts for the selector cards.
// Running the same filter twice over its own output changes nothing.

use crate::core_modules::detection::{HazardDetection, HazardType};
use serde::{Deserialize, Serialize};
use std::fmt;

const TEN_MINUTES_MS: i64 = 600_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// Which hazard type a view is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeSelector {
    #[default]
    All,
    /// A type name compared case-insensitively against the hazard labels.
    /// Names that match no hazard type select nothing.
    Named(String),
}

impl TypeSelector {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            TypeSelector::All
        } else {
            TypeSelector::Named(raw.to_string())
        }
    }

    pub fn matches(&self, hazard_type: HazardType) -> bool {
        match self {
            TypeSelector::All => true,
            TypeSelector::Named(name) => hazard_type.label().eq_ignore_ascii_case(name),
        }
    }

    /// The hazard type this selector names, if it names a known one.
    pub fn hazard_type(&self) -> Option<HazardType> {
        match self {
            TypeSelector::All => None,
            TypeSelector::Named(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for TypeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSelector::All => f.write_str("all"),
            TypeSelector::Named(name) => f.write_str(name),
        }
    }
}

impl From<HazardType> for TypeSelector {
    fn from(hazard_type: HazardType) -> Self {
        TypeSelector::Named(hazard_type.label().to_string())
    }
}

/// Lookback window for the recency predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "10min")]
    TenMinutes,
    #[serde(rename = "hour")]
    Hour,
    #[serde(rename = "day")]
    Day,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::All,
        TimeWindow::TenMinutes,
        TimeWindow::Hour,
        TimeWindow::Day,
    ];

    /// Unrecognised names fall back to `All`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "10min" => TimeWindow::TenMinutes,
            "hour" => TimeWindow::Hour,
            "day" => TimeWindow::Day,
            _ => TimeWindow::All,
        }
    }

    /// Window length in milliseconds; `None` means unbounded.
    pub fn millis(self) -> Option<i64> {
        match self {
            TimeWindow::All => None,
            TimeWindow::TenMinutes => Some(TEN_MINUTES_MS),
            TimeWindow::Hour => Some(HOUR_MS),
            TimeWindow::Day => Some(DAY_MS),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            TimeWindow::All => "all",
            TimeWindow::TenMinutes => "10min",
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::All => "All Time",
            TimeWindow::TenMinutes => "Last 10 Minutes",
            TimeWindow::Hour => "Last Hour",
            TimeWindow::Day => "Today",
        }
    }

    pub fn contains(self, detection: &HazardDetection, now_ms: i64) -> bool {
        match self.millis() {
            None => true,
            Some(window) => detection.age_ms(now_ms) <= window,
        }
    }
}

/// The three user-controlled predicates of a filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParams {
    pub selected_type: TypeSelector,
    /// Inclusive lower bound on severity, kept within [0, 1].
    pub severity_threshold: f64,
    pub time_window: TimeWindow,
}

pub const DEFAULT_SEVERITY_THRESHOLD: f64 = 0.2;

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            selected_type: TypeSelector::All,
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
            time_window: TimeWindow::All,
        }
    }
}

impl FilterParams {
    /// Builds params from the raw strings a page or CLI hands over.
    pub fn from_raw(selected_type: &str, severity_threshold: f64, time_window: &str) -> Self {
        Self {
            selected_type: TypeSelector::parse(selected_type),
            severity_threshold: clamp_threshold(severity_threshold),
            time_window: TimeWindow::parse(time_window),
        }
    }

    /// Params that let every detection through.
    pub fn pass_all() -> Self {
        Self {
            severity_threshold: 0.0,
            ..Self::default()
        }
    }

    pub fn matches(&self, detection: &HazardDetection, now_ms: i64) -> bool {
        self.selected_type.matches(detection.hazard_type)
            && detection.severity >= self.severity_threshold
            && self.time_window.contains(detection, now_ms)
    }
}

fn clamp_threshold(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Returns the detections that pass `params`, preserving input order.
pub fn filter_detections<'a, I>(detections: I, params: &FilterParams, now_ms: i64) -> Vec<HazardDetection>
where
    I: IntoIterator<Item = &'a HazardDetection>,
{
    detections
        .into_iter()
        .filter(|d| params.matches(d, now_ms))
        .cloned()
        .collect()
}

/// Per-type detection counts plus the overall total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub total: usize,
    pub by_type: Vec<(HazardType, usize)>,
}

impl TypeCounts {
    pub fn tally<'a, I>(detections: I) -> Self
    where
        I: IntoIterator<Item = &'a HazardDetection>,
    {
        let mut counts = [0usize; HazardType::ALL.len()];
        let mut total = 0;
        for detection in detections {
            total += 1;
            if let Some(slot) = HazardType::ALL.iter().position(|t| *t == detection.hazard_type) {
                counts[slot] += 1;
            }
        }
        Self {
            total,
            by_type: HazardType::ALL.into_iter().zip(counts).collect(),
        }
    }

    pub fn count(&self, hazard_type: HazardType) -> usize {
        self.by_type
            .iter()
            .find(|(t, _)| *t == hazard_type)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Count shown on a selector card: the total for `All`, the matching type otherwise.
    pub fn for_selector(&self, selector: &TypeSelector) -> usize {
        match selector {
            TypeSelector::All => self.total,
            named => self
                .by_type
                .iter()
                .filter(|(t, _)| named.matches(*t))
                .map(|(_, n)| *n)
                .sum(),
        }
    }
}

/// The output of a filtered view: the passing detections and the selector-card counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView {
    pub detections: Vec<HazardDetection>,
    /// Counts over the unfiltered input, one per selector card.
    pub counts: TypeCounts,
}

impl FilteredView {
    pub fn build<'a, I>(detections: I, params: &FilterParams, now_ms: i64) -> Self
    where
        I: IntoIterator<Item = &'a HazardDetection> + Clone,
    {
        Self {
            detections: filter_detections(detections.clone(), params, now_ms),
            counts: TypeCounts::tally(detections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::fixtures::sample_detections;

    const NOW: i64 = 1_760_000_000_000;

    fn ids(detections: &[HazardDetection]) -> Vec<u64> {
        detections.iter().map(|d| d.id).collect()
    }

    #[test]
    fn severity_half_drops_debris() {
        let fixture = sample_detections(NOW);
        let params = FilterParams::from_raw("all", 0.5, "all");
        let kept = filter_detections(&fixture, &params, NOW);
        assert_eq!(ids(&kept), vec![1, 2, 4, 5]);
        assert!(kept.iter().all(|d| d.hazard_type != HazardType::Debris));
    }

    #[test]
    fn ten_minute_window_keeps_five_and_ten_minute_records() {
        let fixture = sample_detections(NOW);
        let params = FilterParams::from_raw("all", 0.0, "10min");
        let kept = filter_detections(&fixture, &params, NOW);
        assert_eq!(ids(&kept), vec![1, 5]);
    }

    #[test]
    fn hour_and_day_windows() {
        let fixture = sample_detections(NOW);
        let hour = filter_detections(&fixture, &FilterParams::from_raw("all", 0.0, "hour"), NOW);
        assert_eq!(ids(&hour), vec![1, 2, 5]);
        let day = filter_detections(&fixture, &FilterParams::from_raw("all", 0.0, "day"), NOW);
        assert_eq!(ids(&day), vec![1, 2, 3, 5]);
    }

    #[test]
    fn window_bound_is_inclusive() {
        let mut fixture = sample_detections(NOW);
        fixture[0].timestamp = NOW - TEN_MINUTES_MS;
        let kept = filter_detections(&fixture, &FilterParams::from_raw("all", 0.0, "10min"), NOW);
        assert!(kept.iter().any(|d| d.id == 1));
    }

    #[test]
    fn type_match_is_case_insensitive() {
        let fixture = sample_detections(NOW);
        let params = FilterParams::from_raw("POTHOLE", 0.0, "all");
        assert_eq!(ids(&filter_detections(&fixture, &params, NOW)), vec![1, 5]);
        let params = FilterParams::from_raw("speed breaker", 0.0, "all");
        assert_eq!(ids(&filter_detections(&fixture, &params, NOW)), vec![2]);
    }

    #[test]
    fn unknown_type_matches_nothing() {
        let fixture = sample_detections(NOW);
        let params = FilterParams::from_raw("Meteor", 0.0, "all");
        assert!(filter_detections(&fixture, &params, NOW).is_empty());
    }

    #[test]
    fn all_type_is_a_no_op() {
        let fixture = sample_detections(NOW);
        for window in TimeWindow::ALL {
            for threshold in [0.0, 0.3, 0.5, 0.75, 1.0] {
                let all = FilterParams {
                    selected_type: TypeSelector::All,
                    severity_threshold: threshold,
                    time_window: window,
                };
                let expected = fixture
                    .iter()
                    .filter(|d| d.severity >= threshold && window.contains(d, NOW))
                    .count();
                assert_eq!(filter_detections(&fixture, &all, NOW).len(), expected);
            }
        }
    }

    #[test]
    fn filtering_is_idempotent_and_order_preserving() {
        let fixture = sample_detections(NOW);
        let params = FilterParams::from_raw("all", 0.45, "day");
        let once = filter_detections(&fixture, &params, NOW);
        let twice = filter_detections(&once, &params, NOW);
        assert_eq!(once, twice);

        let positions: Vec<usize> = once
            .iter()
            .map(|d| fixture.iter().position(|f| f.id == d.id).expect("from input"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(FilterParams::from_raw("all", 3.0, "all").severity_threshold, 1.0);
        assert_eq!(FilterParams::from_raw("all", -1.0, "all").severity_threshold, 0.0);
        assert_eq!(FilterParams::from_raw("all", f64::NAN, "all").severity_threshold, 0.0);
    }

    #[test]
    fn unknown_window_means_all() {
        assert_eq!(TimeWindow::parse("fortnight"), TimeWindow::All);
        assert_eq!(TimeWindow::parse("hour"), TimeWindow::Hour);
    }

    #[test]
    fn counts_cover_the_unfiltered_input() {
        let fixture = sample_detections(NOW);
        let view = FilteredView::build(&fixture, &FilterParams::from_raw("Debris", 0.9, "all"), NOW);
        assert!(view.detections.is_empty());
        assert_eq!(view.counts.total, 5);
        assert_eq!(view.counts.count(HazardType::Pothole), 2);
        assert_eq!(view.counts.count(HazardType::Animal), 0);
        assert_eq!(view.counts.for_selector(&TypeSelector::parse("debris")), 1);
        assert_eq!(view.counts.for_selector(&TypeSelector::All), 5);
    }
}
