// THEORY:
// The `pipeline` module is the top-level API of the hazard engine. It owns the
// generator (and with it the id counter) and two bounded stores, and exposes the
// handful of operations every surface needs: advance one tick, report a hazard
// by hand, build a filtered view, summarise, and export.
//
// The two stores belong to the two views. The map store takes ambient ticks and
// reported hazards and backs the map, analytics and export. The live store takes
// live ticks only and backs the live panel. Both start from the same fixture and
// use the same ring-buffer capacity; the only thing they share is the id source,
// so an id is never handed out twice across them.
//
// Every operation has an `_at(now)` form that takes the clock as an argument,
// so the whole pipeline can be driven deterministically from tests. The plain
// forms read the wall clock.

use crate::core_modules::analytics::AnalyticsSummary;
use crate::core_modules::detection::{HazardDetection, HazardType, now_millis};
use crate::core_modules::export;
use crate::core_modules::filter::{FilterParams, FilteredView, TypeSelector, filter_detections};
use crate::core_modules::fixtures::{SAMPLE_COUNT, sample_detections};
use crate::core_modules::generator::{DetectionGenerator, GeneratorConfig};
use crate::core_modules::store::{DEFAULT_STORE_CAPACITY, DetectionStore};
use crate::error::HazardResult;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_LIVE_FEED_LEN: usize = 10;
pub const DEFAULT_LIVE_TICK: Duration = Duration::from_secs(5);
pub const DEFAULT_AMBIENT_TICK: Duration = Duration::from_secs(10);

/// Configuration for the HazardPipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub generator: GeneratorConfig,
    pub store_capacity: usize,
    /// How many of the newest detections the live panel lists.
    pub live_feed_len: usize,
    /// Period of the live tick, which only fires while playback is on.
    pub live_tick: Duration,
    /// Period of the ambient tick, which always fires.
    pub ambient_tick: Duration,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Start the store with the five sample detections.
    pub seed_fixture: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            store_capacity: DEFAULT_STORE_CAPACITY,
            live_feed_len: DEFAULT_LIVE_FEED_LEN,
            live_tick: DEFAULT_LIVE_TICK,
            ambient_tick: DEFAULT_AMBIENT_TICK,
            seed: None,
            seed_fixture: true,
        }
    }
}

/// What one tick did to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub detection: HazardDetection,
    /// The oldest entry, if the store was full.
    pub evicted: Option<HazardDetection>,
}

/// The main, top-level struct for the hazard engine.
pub struct HazardPipeline {
    generator: DetectionGenerator,
    /// Map view: fixture, ambient ticks and reported hazards.
    store: DetectionStore,
    /// Live panel: fixture and live ticks.
    live_store: DetectionStore,
    config: PipelineConfig,
}

impl HazardPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::new_at(config, now_millis())
    }

    /// Builds the pipeline, stamping the fixture (if enabled) relative to `now_ms`.
    pub fn new_at(config: PipelineConfig, now_ms: i64) -> Self {
        let (fixture, first_id) = if config.seed_fixture {
            (sample_detections(now_ms), SAMPLE_COUNT + 1)
        } else {
            (Vec::new(), 1)
        };
        let store = DetectionStore::with_entries(config.store_capacity, fixture.clone());
        let live_store = DetectionStore::with_entries(config.store_capacity, fixture);
        let generator = DetectionGenerator::new(config.generator.clone(), first_id, config.seed);
        info!(
            capacity = store.capacity(),
            seeded = store.len(),
            first_id,
            "hazard pipeline ready"
        );
        Self {
            generator,
            store,
            live_store,
            config,
        }
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick_at(now_millis())
    }

    /// Generates one detection and appends it to the map store.
    pub fn tick_at(&mut self, now_ms: i64) -> TickReport {
        let detection = self.generator.generate_at(now_ms);
        append(&mut self.store, detection)
    }

    pub fn live_tick(&mut self) -> TickReport {
        self.live_tick_at(now_millis())
    }

    /// Generates one detection and appends it to the live store.
    pub fn live_tick_at(&mut self, now_ms: i64) -> TickReport {
        let detection = self.generator.generate_at(now_ms);
        append(&mut self.live_store, detection)
    }

    pub fn report_hazard(&mut self, selected: &TypeSelector) -> TickReport {
        self.report_hazard_at(selected, now_millis())
    }

    /// A user-reported hazard of the selected type, or a pothole when no single
    /// type is selected.
    pub fn report_hazard_at(&mut self, selected: &TypeSelector, now_ms: i64) -> TickReport {
        let hazard_type = selected.hazard_type().unwrap_or(HazardType::Pothole);
        let detection = self.generator.generate_of_type(hazard_type, now_ms);
        info!(id = detection.id, %hazard_type, "hazard reported");
        append(&mut self.store, detection)
    }

    pub fn view(&self, params: &FilterParams) -> FilteredView {
        self.view_at(params, now_millis())
    }

    pub fn view_at(&self, params: &FilterParams, now_ms: i64) -> FilteredView {
        FilteredView::build(self.store.iter(), params, now_ms)
    }

    /// The live panel: newest first, from the live store.
    pub fn recent(&self) -> Vec<HazardDetection> {
        self.live_store.recent(self.config.live_feed_len).cloned().collect()
    }

    /// Summary over the map store.
    pub fn analytics(&self) -> AnalyticsSummary {
        AnalyticsSummary::compute(&self.store.to_vec())
    }

    pub fn export_json(&self, params: &FilterParams) -> HazardResult<String> {
        self.export_json_at(params, now_millis())
    }

    /// The filtered list as pretty-printed JSON.
    pub fn export_json_at(&self, params: &FilterParams, now_ms: i64) -> HazardResult<String> {
        export::to_json(&filter_detections(self.store.iter(), params, now_ms))
    }

    pub fn store(&self) -> &DetectionStore {
        &self.store
    }

    pub fn live_store(&self) -> &DetectionStore {
        &self.live_store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The id the next detection will receive.
    pub fn next_id(&self) -> u64 {
        self.generator.next_id()
    }
}

fn append(store: &mut DetectionStore, detection: HazardDetection) -> TickReport {
    let evicted = store.push(detection.clone());
    debug!(
        id = detection.id,
        hazard_type = %detection.hazard_type,
        severity = detection.severity,
        evicted = evicted.as_ref().map(|d| d.id),
        "detection stored"
    );
    TickReport { detection, evicted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::filter::TimeWindow;

    const NOW: i64 = 1_760_000_000_000;

    fn seeded(config: PipelineConfig) -> HazardPipeline {
        HazardPipeline::new_at(
            PipelineConfig {
                seed: Some(42),
                ..config
            },
            NOW,
        )
    }

    #[test]
    fn starts_with_fixture_and_continues_ids() {
        let mut pipeline = seeded(PipelineConfig::default());
        assert_eq!(pipeline.store().len(), 5);
        assert_eq!(pipeline.next_id(), 6);

        let first = pipeline.tick_at(NOW).detection;
        let second = pipeline.tick_at(NOW).detection;
        assert_eq!((first.id, second.id), (6, 7));
        assert_eq!(pipeline.store().latest(), Some(&second));
    }

    #[test]
    fn empty_start_counts_from_one() {
        let mut pipeline = seeded(PipelineConfig {
            seed_fixture: false,
            ..PipelineConfig::default()
        });
        assert!(pipeline.store().is_empty());
        assert_eq!(pipeline.tick_at(NOW).detection.id, 1);
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut pipeline = seeded(PipelineConfig {
            store_capacity: 6,
            ..PipelineConfig::default()
        });
        assert!(pipeline.tick_at(NOW).evicted.is_none());
        let report = pipeline.tick_at(NOW);
        assert_eq!(report.evicted.map(|d| d.id), Some(1));
        assert_eq!(pipeline.store().len(), 6);
    }

    #[test]
    fn live_panel_is_newest_first_and_bounded() {
        let mut pipeline = seeded(PipelineConfig::default());
        for _ in 0..12 {
            pipeline.live_tick_at(NOW);
        }
        let recent = pipeline.recent();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].id, 17);
        assert_eq!(recent[9].id, 8);
        assert_eq!(pipeline.live_store().len(), 17);
        assert_eq!(pipeline.store().len(), 5);
    }

    #[test]
    fn views_keep_separate_stores_with_one_id_source() {
        let mut pipeline = seeded(PipelineConfig::default());
        let ambient = pipeline.tick_at(NOW).detection;
        let live = pipeline.live_tick_at(NOW).detection;
        let reported = pipeline.report_hazard_at(&TypeSelector::All, NOW).detection;
        assert_eq!((ambient.id, live.id, reported.id), (6, 7, 8));

        let map_ids: Vec<u64> = pipeline.store().iter().map(|d| d.id).collect();
        assert_eq!(map_ids, vec![1, 2, 3, 4, 5, 6, 8]);
        let panel_ids: Vec<u64> = pipeline.recent().iter().map(|d| d.id).collect();
        assert_eq!(panel_ids, vec![7, 5, 4, 3, 2, 1]);
        assert_eq!(pipeline.analytics().total, 7);
    }

    #[test]
    fn report_hazard_uses_selected_type() {
        let mut pipeline = seeded(PipelineConfig::default());
        let debris = pipeline.report_hazard_at(&TypeSelector::parse("debris"), NOW);
        assert_eq!(debris.detection.hazard_type, HazardType::Debris);
        let fallback = pipeline.report_hazard_at(&TypeSelector::All, NOW);
        assert_eq!(fallback.detection.hazard_type, HazardType::Pothole);
        let unknown = pipeline.report_hazard_at(&TypeSelector::parse("meteor"), NOW);
        assert_eq!(unknown.detection.hazard_type, HazardType::Pothole);
    }

    #[test]
    fn view_counts_cover_whole_store() {
        let pipeline = seeded(PipelineConfig::default());
        let params = FilterParams {
            selected_type: TypeSelector::from(HazardType::Pothole),
            severity_threshold: 0.0,
            time_window: TimeWindow::TenMinutes,
        };
        let view = pipeline.view_at(&params, NOW);
        assert_eq!(view.detections.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(view.counts.total, 5);
        assert_eq!(view.counts.count(HazardType::Pothole), 2);
    }

    #[test]
    fn export_matches_view() {
        let pipeline = seeded(PipelineConfig::default());
        let params = FilterParams::from_raw("all", 0.5, "all");
        let json = pipeline.export_json_at(&params, NOW).expect("export");
        let restored = export::from_json(&json).expect("parse");
        assert_eq!(restored, pipeline.view_at(&params, NOW).detections);
        assert_eq!(pipeline.analytics().total, 5);
    }
}
