// THEORY:
// This file is the main entry point for the `hazard_watch` library crate.
//
// The primary goal is to export the `HazardPipeline` and the `LiveFeed` runner,
// with their associated data structures (`PipelineConfig`, `FilterParams`,
// `HazardDetection`, ...), as the high-level interface to the hazard engine.
// The detection model, generator, store, filter and the media/session state live
// in `core_modules` and are public for surfaces that render them directly.

pub mod core_modules;
pub mod error;
pub mod live_pipeline;
pub mod pipeline;

pub use core_modules::detection::{HazardDetection, HazardType};
pub use core_modules::filter::{FilterParams, FilteredView, TimeWindow, TypeSelector};
pub use error::{HazardError, HazardResult};
pub use live_pipeline::{FeedEvent, LiveFeed, SharedPipeline};
pub use pipeline::{HazardPipeline, PipelineConfig, TickReport};
