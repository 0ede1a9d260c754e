// THEORY:
// The `live_pipeline` module drives a shared `HazardPipeline` from two timers.
//
// 1.  **Live tick**: fires every `live_tick` (5 s) but only while the live flag is
//     on. The flag is a `watch` channel owned by whoever controls playback; turning
//     it on restarts the period so the first live detection lands one full period
//     after playback starts.
// 2.  **Ambient tick**: fires every `ambient_tick` (10 s) unconditionally.
//
// Live detections go to the pipeline's live store and ambient ones to its map
// store, each under the pipeline's write lock so ids stay unique across both.
// Every detection is then announced on a `broadcast` channel as a `FeedEvent`. Announcing is best
// effort: with no subscribers the detection is still stored.
//
// The runner is a single tokio task. `shutdown` stops it and waits for it; dropping
// the handle aborts it, so the timers never outlive their owner.

use crate::core_modules::detection::HazardDetection;
use crate::pipeline::HazardPipeline;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

pub type SharedPipeline = Arc<RwLock<HazardPipeline>>;

pub fn shared(pipeline: HazardPipeline) -> SharedPipeline {
    Arc::new(RwLock::new(pipeline))
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Produced by the live tick; the live page announces these.
    Live(HazardDetection),
    /// Produced by the ambient tick.
    Ambient(HazardDetection),
}

impl FeedEvent {
    pub fn detection(&self) -> &HazardDetection {
        match self {
            FeedEvent::Live(d) | FeedEvent::Ambient(d) => d,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, FeedEvent::Live(_))
    }
}

pub struct LiveFeed {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LiveFeed {
    /// Starts the timers. Must be called from within a tokio runtime.
    pub fn spawn(
        pipeline: SharedPipeline,
        mut live_rx: watch::Receiver<bool>,
        events_tx: broadcast::Sender<FeedEvent>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let (live_period, ambient_period) = {
                let pipeline = pipeline.read().await;
                (pipeline.config().live_tick, pipeline.config().ambient_tick)
            };
            let start = Instant::now();
            let mut live = interval_at(start + live_period, live_period);
            let mut ambient = interval_at(start + ambient_period, ambient_period);
            live.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ambient.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut live_on = *live_rx.borrow_and_update();
            let mut control_open = true;
            info!(live = live_on, ?live_period, ?ambient_period, "live feed started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = live.tick(), if live_on => {
                        let detection = pipeline.write().await.live_tick().detection;
                        debug!(id = detection.id, "live tick");
                        let _ = events_tx.send(FeedEvent::Live(detection));
                    }
                    _ = ambient.tick() => {
                        let detection = pipeline.write().await.tick().detection;
                        debug!(id = detection.id, "ambient tick");
                        let _ = events_tx.send(FeedEvent::Ambient(detection));
                    }
                    changed = live_rx.changed(), if control_open => {
                        if changed.is_err() {
                            // Controller gone: playback can never resume.
                            control_open = false;
                            live_on = false;
                            continue;
                        }
                        let now_on = *live_rx.borrow_and_update();
                        if now_on && !live_on {
                            live.reset();
                        }
                        if now_on != live_on {
                            info!(live = now_on, "live feed toggled");
                        }
                        live_on = now_on;
                    }
                }
            }
            info!("live feed stopped");
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Stops both timers and waits for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
