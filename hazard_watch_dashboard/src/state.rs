// THEORY:
// Shared state behind every request. The pipeline sits behind its own RwLock and
// is also driven by the `LiveFeed` timers; the live-page session (video source,
// privacy toggle, notices) sits behind a tokio Mutex. Handlers never hold both
// locks at once.
//
// Live detections reach the session through a small collector task that listens
// on the feed's broadcast channel and turns each one into a banner and a notice.

use hazard_watch::core_modules::media::{BlobRegistry, CaptureDevice, DeviceCamera};
use hazard_watch::core_modules::session::FeedSession;
use hazard_watch::live_pipeline::{self, FeedEvent, LiveFeed, SharedPipeline};
use hazard_watch::HazardPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const FEED_EVENT_CAPACITY: usize = 64;

/// Hands out a fresh capture device each time the camera is started.
pub type CameraFactory = Arc<dyn Fn() -> Box<dyn CaptureDevice> + Send + Sync>;

pub fn device_camera(path: impl Into<PathBuf>) -> CameraFactory {
    let path = path.into();
    Arc::new(move || Box::new(DeviceCamera::new(path.clone())) as Box<dyn CaptureDevice>)
}

/// Playback switch shared by the control endpoints and the live timer.
#[derive(Clone)]
pub struct ControlHandle {
    pub play_tx: watch::Sender<bool>,
}

impl ControlHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (play_tx, play_rx) = watch::channel(false);
        (Self { play_tx }, play_rx)
    }

    pub fn play(&self) {
        self.play_tx.send_replace(true);
    }

    pub fn pause(&self) {
        self.play_tx.send_replace(false);
    }

    pub fn is_playing(&self) -> bool {
        *self.play_tx.borrow()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: SharedPipeline,
    pub session: Arc<Mutex<FeedSession>>,
    pub control: ControlHandle,
    camera: CameraFactory,
}

impl AppState {
    pub fn open_camera(&self) -> Box<dyn CaptureDevice> {
        (self.camera)()
    }
}

/// A running dashboard backend: state plus the tasks feeding it.
pub struct Dashboard {
    pub state: AppState,
    feed: LiveFeed,
    collector: JoinHandle<()>,
}

impl Dashboard {
    /// Starts the feed timers and the notice collector. Must run inside a tokio runtime.
    pub fn launch(pipeline: HazardPipeline, camera: CameraFactory) -> Self {
        let pipeline = live_pipeline::shared(pipeline);
        let session = Arc::new(Mutex::new(FeedSession::new(BlobRegistry::new())));
        let (control, play_rx) = ControlHandle::new();
        let (events_tx, events_rx) = broadcast::channel(FEED_EVENT_CAPACITY);

        let collector = spawn_collector(session.clone(), events_rx);
        let feed = LiveFeed::spawn(pipeline.clone(), play_rx, events_tx);

        Self {
            state: AppState {
                pipeline,
                session,
                control,
                camera,
            },
            feed,
            collector,
        }
    }

    pub async fn shutdown(self) {
        self.feed.shutdown().await;
        // The feed owned the only sender, so the collector sees `Closed` and exits.
        let _ = self.collector.await;
    }
}

fn spawn_collector(
    session: Arc<Mutex<FeedSession>>,
    mut events_rx: broadcast::Receiver<FeedEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(FeedEvent::Live(detection)) => session.lock().await.record_detection(detection),
                Ok(FeedEvent::Ambient(detection)) => debug!(id = detection.id, "ambient detection"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notice collector lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
