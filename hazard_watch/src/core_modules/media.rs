// THEORY:
// The `media` module owns the lifetime of video sources. The dashboard can show
// either a live camera or an uploaded demo video, never both, and whichever one
// is showing holds a real resource: an open capture stream whose tracks must be
// stopped, or a registered blob URL that must be revoked.
//
// Key architectural principles:
// 1.  **One Capability Interface**: Every source implements `MediaSource`
//     (`acquire`, `release`, `is_active`). Call sites never touch devices or blob
//     URLs directly.
// 2.  **Central Exclusivity**: The `MediaController` is the only place sources are
//     swapped. A new source is acquired first; only once that succeeds is the
//     previous source released and replaced. A failed acquisition leaves the
//     controller exactly as it was. The cost is a short overlap: between the new
//     source's `acquire` and the old one's `release`, both hold their resources
//     (for a camera replacing an upload, the open stream and the stored blob).
//     At most two sources are live at once, and only inside `start`.
// 3.  **Release on Every Path**: `release` is idempotent, and both the sources and
//     the controller release on `Drop`, so early returns and panics cannot leak a
//     stream or a blob.

use crate::error::{HazardError, HazardResult};
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const BLOB_URL_PREFIX: &str = "blob:hazard-watch/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Camera,
    UploadedVideo,
}

/// A video source whose underlying resource is held between `acquire` and `release`.
pub trait MediaSource: Send {
    fn kind(&self) -> SourceKind;

    /// Takes hold of the underlying resource. Acquiring an active source is a no-op.
    fn acquire(&mut self) -> HazardResult<()>;

    /// Gives the resource back. Releasing an inactive source is a no-op.
    fn release(&mut self);

    fn is_active(&self) -> bool;

    /// What the video sink is attached to while active (device path or blob URL).
    fn sink(&self) -> Option<String>;
}

// --- Camera ---

/// An open capture stream made of one or more tracks.
pub trait CaptureStream: Send {
    fn live_tracks(&self) -> usize;
    fn stop_tracks(&mut self);
}

/// Something that can hand out capture streams, e.g. a V4L device node.
pub trait CaptureDevice: Send {
    fn open(&mut self) -> HazardResult<Box<dyn CaptureStream>>;
    fn describe(&self) -> String;
}

/// A capture device backed by a device node on the host.
#[derive(Debug, Clone)]
pub struct DeviceCamera {
    path: PathBuf,
}

impl DeviceCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for DeviceCamera {
    fn default() -> Self {
        Self::new(DEFAULT_CAMERA_DEVICE)
    }
}

struct DeviceStream {
    handle: Option<File>,
}

impl CaptureStream for DeviceStream {
    fn live_tracks(&self) -> usize {
        usize::from(self.handle.is_some())
    }

    fn stop_tracks(&mut self) {
        self.handle.take();
    }
}

impl CaptureDevice for DeviceCamera {
    fn open(&mut self) -> HazardResult<Box<dyn CaptureStream>> {
        let handle = File::open(&self.path)
            .map_err(|e| HazardError::Camera(format!("{}: {}", self.path.display(), e)))?;
        Ok(Box::new(DeviceStream {
            handle: Some(handle),
        }))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A camera as a media source: active while it holds an open stream.
pub struct CameraSource {
    device: Box<dyn CaptureDevice>,
    stream: Option<Box<dyn CaptureStream>>,
}

impl CameraSource {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            stream: None,
        }
    }

    pub fn live_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.live_tracks())
    }
}

impl MediaSource for CameraSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Camera
    }

    fn acquire(&mut self) -> HazardResult<()> {
        if self.stream.is_none() {
            self.stream = Some(self.device.open()?);
            debug!(device = %self.device.describe(), "camera stream opened");
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
            debug!(device = %self.device.describe(), "camera tracks stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    fn sink(&self) -> Option<String> {
        self.stream.as_ref().map(|_| self.device.describe())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

// --- Uploaded video ---

/// A registered upload: its original file name and bytes.
#[derive(Debug, Clone)]
pub struct VideoBlob {
    pub name: String,
    pub data: Arc<[u8]>,
}

/// Transient `blob:` URLs for uploaded videos. Cheap to clone; clones share the table.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<String, VideoBlob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, VideoBlob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_object_url(&self, blob: VideoBlob) -> String {
        let url = format!("{}{}", BLOB_URL_PREFIX, uuid::Uuid::new_v4());
        self.table().insert(url.clone(), blob);
        url
    }

    /// Returns whether the URL was registered.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        self.table().remove(url).is_some()
    }

    pub fn resolve(&self, url: &str) -> Option<VideoBlob> {
        self.table().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

/// An uploaded video as a media source: active while its blob URL is registered.
pub struct UploadedVideo {
    registry: BlobRegistry,
    blob: VideoBlob,
    url: Option<String>,
}

impl UploadedVideo {
    pub fn new(registry: BlobRegistry, name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> HazardResult<Self> {
        let blob = VideoBlob {
            name: name.into(),
            data: data.into(),
        };
        if blob.data.is_empty() {
            return Err(HazardError::EmptyUpload(blob.name));
        }
        Ok(Self {
            registry,
            blob,
            url: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.blob.name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl MediaSource for UploadedVideo {
    fn kind(&self) -> SourceKind {
        SourceKind::UploadedVideo
    }

    fn acquire(&mut self) -> HazardResult<()> {
        if self.url.is_none() {
            let url = self.registry.create_object_url(self.blob.clone());
            debug!(%url, name = %self.blob.name, "blob url created");
            self.url = Some(url);
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(url) = self.url.take() {
            self.registry.revoke_object_url(&url);
            debug!(%url, "blob url revoked");
        }
    }

    fn is_active(&self) -> bool {
        self.url.is_some()
    }

    fn sink(&self) -> Option<String> {
        self.url.clone()
    }
}

impl Drop for UploadedVideo {
    fn drop(&mut self) {
        self.release();
    }
}

// --- Controller ---

/// Holds at most one active video source.
#[derive(Default)]
pub struct MediaController {
    active: Option<Box<dyn MediaSource>>,
}

impl MediaController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires `source` and makes it the active one, releasing the previous source.
    /// On failure nothing changes and the previous source (if any) stays active.
    pub fn start(&mut self, mut source: Box<dyn MediaSource>) -> HazardResult<SourceKind> {
        let kind = source.kind();
        if let Err(e) = source.acquire() {
            warn!(?kind, error = %e, "video source could not be acquired");
            return Err(e);
        }
        if let Some(mut previous) = self.active.take() {
            previous.release();
            info!(previous = ?previous.kind(), next = ?kind, "video source replaced");
        } else {
            info!(?kind, "video source started");
        }
        self.active = Some(source);
        Ok(kind)
    }

    /// Releases the active source, returning its kind.
    pub fn stop(&mut self) -> Option<SourceKind> {
        let mut source = self.active.take()?;
        source.release();
        info!(kind = ?source.kind(), "video source stopped");
        Some(source.kind())
    }

    /// Releases the active source only if it is of `kind`.
    pub fn stop_kind(&mut self, kind: SourceKind) -> bool {
        if self.active_kind() == Some(kind) {
            self.stop();
            true
        } else {
            false
        }
    }

    pub fn active_kind(&self) -> Option<SourceKind> {
        self.active.as_ref().map(|s| s.kind())
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn sink(&self) -> Option<String> {
        self.active.as_ref().and_then(|s| s.sink())
    }
}

impl Drop for MediaController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A capture device that counts open streams and can be told to fail.
    #[derive(Clone, Default)]
    pub struct FakeCamera {
        pub open_streams: Arc<AtomicUsize>,
        pub fail: bool,
    }

    struct FakeStream {
        open_streams: Arc<AtomicUsize>,
        live: bool,
    }

    impl CaptureStream for FakeStream {
        fn live_tracks(&self) -> usize {
            usize::from(self.live)
        }

        fn stop_tracks(&mut self) {
            if self.live {
                self.live = false;
                self.open_streams.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl CaptureDevice for FakeCamera {
        fn open(&mut self) -> HazardResult<Box<dyn CaptureStream>> {
            if self.fail {
                return Err(HazardError::Camera("permission denied".into()));
            }
            self.open_streams.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                open_streams: self.open_streams.clone(),
                live: true,
            }))
        }

        fn describe(&self) -> String {
            "fake-camera".into()
        }
    }

    impl FakeCamera {
        pub fn open_count(&self) -> usize {
            self.open_streams.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeCamera;
    use super::*;

    fn upload(registry: &BlobRegistry) -> Box<dyn MediaSource> {
        Box::new(UploadedVideo::new(registry.clone(), "road.mp4", vec![1u8, 2, 3]).expect("upload"))
    }

    #[test]
    fn camera_replaces_upload_and_revokes_blob() {
        let registry = BlobRegistry::new();
        let camera = FakeCamera::default();
        let mut controller = MediaController::new();

        controller.start(upload(&registry)).expect("upload starts");
        let blob_url = controller.sink().expect("blob url");
        assert!(registry.resolve(&blob_url).is_some());

        controller
            .start(Box::new(CameraSource::new(Box::new(camera.clone()))))
            .expect("camera starts");

        assert_eq!(controller.active_kind(), Some(SourceKind::Camera));
        assert!(controller.is_active());
        assert!(registry.resolve(&blob_url).is_none());
        assert!(registry.is_empty());
        assert_eq!(camera.open_count(), 1);
    }

    #[test]
    fn upload_replaces_camera_and_stops_tracks() {
        let registry = BlobRegistry::new();
        let camera = FakeCamera::default();
        let mut controller = MediaController::new();

        controller
            .start(Box::new(CameraSource::new(Box::new(camera.clone()))))
            .expect("camera starts");
        assert_eq!(camera.open_count(), 1);

        controller.start(upload(&registry)).expect("upload starts");
        assert_eq!(camera.open_count(), 0);
        assert_eq!(controller.active_kind(), Some(SourceKind::UploadedVideo));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failed_camera_keeps_previous_source() {
        let registry = BlobRegistry::new();
        let broken = FakeCamera {
            fail: true,
            ..FakeCamera::default()
        };
        let mut controller = MediaController::new();
        controller.start(upload(&registry)).expect("upload starts");
        let blob_url = controller.sink().expect("blob url");

        let err = controller
            .start(Box::new(CameraSource::new(Box::new(broken))))
            .expect_err("camera must fail");
        assert!(matches!(err, HazardError::Camera(_)));
        assert_eq!(controller.active_kind(), Some(SourceKind::UploadedVideo));
        assert!(registry.resolve(&blob_url).is_some());
    }

    #[test]
    fn failed_camera_from_idle_stays_idle() {
        let mut controller = MediaController::new();
        let broken = FakeCamera {
            fail: true,
            ..FakeCamera::default()
        };
        assert!(controller.start(Box::new(CameraSource::new(Box::new(broken)))).is_err());
        assert!(!controller.is_active());
        assert_eq!(controller.active_kind(), None);
    }

    #[test]
    fn stop_kind_only_stops_matching_source() {
        let registry = BlobRegistry::new();
        let mut controller = MediaController::new();
        controller.start(upload(&registry)).expect("upload starts");
        assert!(!controller.stop_kind(SourceKind::Camera));
        assert!(controller.is_active());
        assert!(controller.stop_kind(SourceKind::UploadedVideo));
        assert!(!controller.is_active());
        assert!(registry.is_empty());
        assert_eq!(controller.stop(), None);
    }

    #[test]
    fn dropping_controller_releases_everything() {
        let camera = FakeCamera::default();
        {
            let mut controller = MediaController::new();
            controller
                .start(Box::new(CameraSource::new(Box::new(camera.clone()))))
                .expect("camera starts");
            assert_eq!(camera.open_count(), 1);
        }
        assert_eq!(camera.open_count(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let camera = FakeCamera::default();
        let mut source = CameraSource::new(Box::new(camera.clone()));
        source.acquire().expect("acquire");
        source.acquire().expect("second acquire is a no-op");
        assert_eq!(camera.open_count(), 1);
        assert_eq!(source.live_tracks(), 1);
        source.release();
        source.release();
        assert_eq!(camera.open_count(), 0);
        assert!(!source.is_active());
    }

    #[test]
    fn empty_upload_is_rejected() {
        let result = UploadedVideo::new(BlobRegistry::new(), "empty.mp4", Vec::<u8>::new());
        assert!(matches!(result, Err(HazardError::EmptyUpload(_))));
    }

    #[test]
    fn missing_device_node_is_a_camera_error() {
        let mut device = DeviceCamera::new("/definitely/not/a/camera");
        assert!(matches!(device.open(), Err(HazardError::Camera(_))));
    }
}
