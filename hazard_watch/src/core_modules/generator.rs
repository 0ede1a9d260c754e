// THEORY:
// The `DetectionGenerator` is the stand-in for a real detector. Each call produces
// one synthetic `HazardDetection` from nothing but a random source, the clock and
// an id counter. It has no failure modes.
//
// Key architectural principles:
// 1.  **Owned Counter**: The next id lives inside the generator, so two generators
//     never share hidden state. Whoever owns the generator (the pipeline) owns the
//     id sequence, and ids are unique for as long as that owner lives.
// 2.  **Injectable Randomness**: The generator is generic over `rand::Rng`. Production
//     code uses an OS-seeded `StdRng`; tests seed it for reproducible output.
// 3.  **Explicit Time**: `generate_at` takes `now` as an argument; `generate` reads
//     the wall clock. Filters are written against the same explicit `now`.

use crate::core_modules::detection::{HazardDetection, HazardType, now_millis};
use crate::core_modules::fixtures::SAMPLE_IMAGE_URLS;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CONFIDENCE_FLOOR: f64 = 0.6;
const CONFIDENCE_SPAN: f64 = 0.4;
const DAY_MS: f64 = 86_400_000.0;

/// Tunables for synthetic detections.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Latitude every detection is jittered around.
    pub base_lat: f64,
    /// Longitude every detection is jittered around.
    pub base_lon: f64,
    /// Full width of the uniform jitter box, in degrees.
    pub jitter_deg: f64,
    /// How far back in time a detection may be stamped, in milliseconds.
    pub lookback_ms: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_lat: 12.97,
            base_lon: 77.594,
            jitter_deg: 0.01,
            lookback_ms: DAY_MS,
        }
    }
}

/// Produces synthetic detections with session-unique ids.
pub struct DetectionGenerator<R: Rng = StdRng> {
    config: GeneratorConfig,
    rng: R,
    next_id: u64,
}

impl DetectionGenerator<StdRng> {
    /// A generator seeded from `seed`, or from fresh randomness when `None`.
    pub fn new(config: GeneratorConfig, first_id: u64, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self::with_rng(config, first_id, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DetectionGenerator<R> {
    pub fn with_rng(config: GeneratorConfig, first_id: u64, rng: R) -> Self {
        Self {
            config,
            rng,
            next_id: first_id,
        }
    }

    /// The id the next detection will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate(&mut self) -> HazardDetection {
        self.generate_at(now_millis())
    }

    /// Produces one detection stamped within the lookback window before `now_ms`.
    pub fn generate_at(&mut self, now_ms: i64) -> HazardDetection {
        let hazard_type = HazardType::ALL[self.rng.random_range(0..HazardType::ALL.len())];
        let confidence = below_one(CONFIDENCE_FLOOR + self.rng.random::<f64>() * CONFIDENCE_SPAN);
        let severity = self.rng.random::<f64>();
        let lat = self.config.base_lat + (self.rng.random::<f64>() - 0.5) * self.config.jitter_deg;
        let lon = self.config.base_lon + (self.rng.random::<f64>() - 0.5) * self.config.jitter_deg;
        let offset = (self.rng.random::<f64>() * self.config.lookback_ms).floor() as i64;
        let image_url = SAMPLE_IMAGE_URLS[self.rng.random_range(0..SAMPLE_IMAGE_URLS.len())];

        let id = self.next_id;
        self.next_id += 1;

        HazardDetection {
            id,
            hazard_type,
            lat,
            lon,
            confidence,
            severity,
            timestamp: now_ms - offset,
            image_url: Some(image_url.to_string()),
        }
    }

    /// Same as [`generate_at`](Self::generate_at) but with a fixed hazard type.
    pub fn generate_of_type(&mut self, hazard_type: HazardType, now_ms: i64) -> HazardDetection {
        HazardDetection {
            hazard_type,
            ..self.generate_at(now_ms)
        }
    }
}

/// `0.6 + u * 0.4` can round up to exactly 1.0 for `u` just below one.
fn below_one(value: f64) -> f64 {
    if value < 1.0 {
        value
    } else {
        f64::from_bits(1.0f64.to_bits() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    fn seeded(seed: u64) -> DetectionGenerator {
        DetectionGenerator::new(GeneratorConfig::default(), 6, Some(seed))
    }

    #[test]
    fn generated_values_stay_in_range() {
        let mut generator = seeded(42);
        let config = generator.config().clone();
        for _ in 0..5_000 {
            let d = generator.generate_at(NOW);
            assert!((0.6..1.0).contains(&d.confidence), "confidence {}", d.confidence);
            assert!((0.0..1.0).contains(&d.severity), "severity {}", d.severity);
            assert!(HazardType::ALL.contains(&d.hazard_type));
            assert!((d.lat - config.base_lat).abs() <= config.jitter_deg / 2.0 + 1e-9);
            assert!((d.lon - config.base_lon).abs() <= config.jitter_deg / 2.0 + 1e-9);
            let age = d.age_ms(NOW);
            assert!((0..86_400_000).contains(&age), "age {}", age);
            let url = d.image_url.as_deref().expect("image url");
            assert!(SAMPLE_IMAGE_URLS.contains(&url));
        }
    }

    #[test]
    fn ids_are_sequential_from_first_id() {
        let mut generator = seeded(1);
        let ids: Vec<u64> = (0..4).map(|_| generator.generate_at(NOW).id).collect();
        assert_eq!(ids, vec![6, 7, 8, 9]);
        assert_eq!(generator.next_id(), 10);
    }

    #[test]
    fn independent_generators_do_not_share_counters() {
        let mut a = seeded(1);
        let mut b = seeded(2);
        a.generate_at(NOW);
        a.generate_at(NOW);
        assert_eq!(b.generate_at(NOW).id, 6);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = seeded(99);
        let mut b = seeded(99);
        for _ in 0..10 {
            assert_eq!(a.generate_at(NOW), b.generate_at(NOW));
        }
    }

    #[test]
    fn every_type_eventually_appears() {
        let mut generator = seeded(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(generator.generate_at(NOW).hazard_type);
        }
        assert_eq!(seen.len(), HazardType::ALL.len());
    }

    #[test]
    fn forced_type_is_kept() {
        let mut generator = seeded(3);
        let d = generator.generate_of_type(HazardType::Crack, NOW);
        assert_eq!(d.hazard_type, HazardType::Crack);
        assert_eq!(d.id, 6);
    }

    #[test]
    fn confidence_clamp_stays_below_one() {
        assert!(below_one(1.0) < 1.0);
        assert_eq!(below_one(0.75), 0.75);
    }
}
