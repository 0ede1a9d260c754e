//! Live-feed page state: the video source, privacy toggle, running flag, the
//! latest detection banner and the notices raised along the way.

use crate::core_modules::detection::HazardDetection;
use crate::core_modules::media::{
    BlobRegistry, CameraSource, CaptureDevice, MediaController, SourceKind, UploadedVideo,
};
use crate::core_modules::notice::{Notice, NoticeBoard};
use crate::error::{HazardError, HazardResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedMode {
    Idle,
    LiveCamera,
    DemoVideo,
}

impl FeedMode {
    pub fn label(self) -> &'static str {
        match self {
            FeedMode::Idle => "Idle",
            FeedMode::LiveCamera => "Live Camera",
            FeedMode::DemoVideo => "Demo Video",
        }
    }

    /// Caption drawn over the video area.
    pub fn caption(self) -> &'static str {
        match self {
            FeedMode::Idle => "Idle Mode",
            FeedMode::LiveCamera => "Live Camera Active",
            FeedMode::DemoVideo => "Video Demo",
        }
    }
}

pub struct FeedSession {
    media: MediaController,
    blobs: BlobRegistry,
    privacy_mode: bool,
    live: bool,
    latest: Option<HazardDetection>,
    notices: NoticeBoard,
}

impl FeedSession {
    pub fn new(blobs: BlobRegistry) -> Self {
        Self {
            media: MediaController::new(),
            blobs,
            privacy_mode: true,
            live: false,
            latest: None,
            notices: NoticeBoard::default(),
        }
    }

    /// Opens `device` as the video source. On failure an error notice is raised
    /// and the current source keeps playing.
    pub fn start_camera(&mut self, device: Box<dyn CaptureDevice>) -> HazardResult<()> {
        match self.media.start(Box::new(CameraSource::new(device))) {
            Ok(_) => {
                self.live = true;
                self.notices.push(Notice::success("Camera started successfully"));
                Ok(())
            }
            Err(e) => {
                self.notices
                    .push(Notice::error("Unable to access camera").with_description(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn stop_camera(&mut self) -> bool {
        let stopped = self.media.stop_kind(SourceKind::Camera);
        if stopped {
            self.live = false;
            self.notices.push(Notice::plain("Camera stopped"));
        }
        stopped
    }

    /// Replaces whatever is playing with an uploaded video. Returns its blob URL.
    pub fn load_video(&mut self, name: &str, data: Vec<u8>) -> HazardResult<String> {
        let video = UploadedVideo::new(self.blobs.clone(), name, data)?;
        self.media.start(Box::new(video))?;
        self.live = true;
        self.notices
            .push(Notice::success(format!("Loaded demo video: {}", name)));
        self.media.sink().ok_or(HazardError::NoSource)
    }

    pub fn stop_video(&mut self) -> bool {
        let stopped = self.media.stop_kind(SourceKind::UploadedVideo);
        if stopped {
            self.live = false;
        }
        stopped
    }

    /// Records a live detection for the banner and announces it.
    pub fn record_detection(&mut self, detection: HazardDetection) {
        self.notices.push(Notice::for_detection(&detection));
        self.latest = Some(detection);
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_privacy_mode(&mut self, enabled: bool) {
        self.privacy_mode = enabled;
    }

    pub fn privacy_mode(&self) -> bool {
        self.privacy_mode
    }

    pub fn mode(&self) -> FeedMode {
        match self.media.active_kind() {
            Some(SourceKind::Camera) => FeedMode::LiveCamera,
            Some(SourceKind::UploadedVideo) => FeedMode::DemoVideo,
            None => FeedMode::Idle,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.live { "Running" } else { "Stopped" }
    }

    pub fn video_sink(&self) -> Option<String> {
        self.media.sink()
    }

    pub fn latest(&self) -> Option<&HazardDetection> {
        self.latest.as_ref()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::fixtures::sample_detections;
    use crate::core_modules::media::testing::FakeCamera;
    use crate::core_modules::notice::NoticeLevel;

    #[test]
    fn camera_after_upload_leaves_one_source() {
        let camera = FakeCamera::default();
        let mut session = FeedSession::new(BlobRegistry::new());

        let url = session.load_video("demo.mp4", vec![0u8; 16]).expect("video loads");
        assert_eq!(session.mode(), FeedMode::DemoVideo);
        assert!(session.blobs().resolve(&url).is_some());

        session.start_camera(Box::new(camera.clone())).expect("camera starts");
        assert_eq!(session.mode(), FeedMode::LiveCamera);
        assert_eq!(camera.open_count(), 1);
        assert!(session.blobs().resolve(&url).is_none());
        assert!(session.is_live());
        assert_eq!(
            session.notices().latest().map(|n| n.title.as_str()),
            Some("Camera started successfully")
        );
    }

    #[test]
    fn camera_failure_notifies_and_keeps_state() {
        let mut session = FeedSession::new(BlobRegistry::new());
        let broken = FakeCamera {
            fail: true,
            ..FakeCamera::default()
        };
        assert!(session.start_camera(Box::new(broken)).is_err());
        assert_eq!(session.mode(), FeedMode::Idle);
        assert!(!session.is_live());
        let notice = session.notices().latest().expect("notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Unable to access camera");
    }

    #[test]
    fn stopping_returns_to_idle() {
        let camera = FakeCamera::default();
        let mut session = FeedSession::new(BlobRegistry::new());
        session.start_camera(Box::new(camera.clone())).expect("camera starts");
        assert!(!session.stop_video());
        assert!(session.stop_camera());
        assert_eq!(camera.open_count(), 0);
        assert_eq!(session.mode(), FeedMode::Idle);
        assert_eq!(session.status_label(), "Stopped");
        assert!(!session.stop_camera());
    }

    #[test]
    fn detections_update_banner() {
        let mut session = FeedSession::new(BlobRegistry::new());
        let detection = sample_detections(0).remove(1);
        session.record_detection(detection.clone());
        assert_eq!(session.latest(), Some(&detection));
        assert_eq!(
            session.notices().latest().map(|n| n.title.as_str()),
            Some("New Speed Breaker detected!")
        );
    }
}
