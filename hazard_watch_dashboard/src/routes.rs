//! HTTP surface of the dashboard. GET routes render pages from a snapshot of the
//! shared state; POST routes are plain HTML form targets that change state and
//! redirect (303) back to the page they came from.

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::pages::{self, AnalyticsModel, LiveModel, MapModel, SystemModel};
use crate::state::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use bytes::Bytes;
use hazard_watch::core_modules::analytics::AnalyticsSummary;
use hazard_watch::core_modules::export::EXPORT_FILE_NAME;
use hazard_watch::core_modules::filter::DEFAULT_SEVERITY_THRESHOLD;
use hazard_watch::core_modules::map::MapLayers;
use hazard_watch::core_modules::notice::Notice;
use hazard_watch::core_modules::session::FeedMode;
use hazard_watch::{FilterParams, TypeSelector};
use serde::Deserialize;
use tracing::{error, info, warn};

const NOTICES_SHOWN: usize = 5;
const VIDEO_ROUTE: &str = "/media/video";

/// Filter parameters as they arrive in a query string.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(rename = "type")]
    pub hazard_type: Option<String>,
    /// Kept raw so a blank or malformed value falls back to the default threshold.
    pub severity: Option<String>,
    pub window: Option<String>,
    pub landmarks: Option<String>,
}

impl FilterQuery {
    pub fn params(&self) -> FilterParams {
        FilterParams::from_raw(
            self.hazard_type.as_deref().unwrap_or("all"),
            self.severity
                .as_deref()
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .unwrap_or(DEFAULT_SEVERITY_THRESHOLD),
            self.window.as_deref().unwrap_or("all"),
        )
    }

    /// Landmarks are on unless explicitly switched off.
    pub fn show_landmarks(&self) -> bool {
        !matches!(
            self.landmarks.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("off" | "false" | "0" | "hide")
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    #[serde(rename = "type", default)]
    pub hazard_type: String,
}

pub fn router(state: AppState) -> Router {
    router_with_upload_limit(state, DEFAULT_MAX_UPLOAD_BYTES)
}

/// The router with `/media/upload` accepting request bodies up to `max_upload_bytes`.
pub fn router_with_upload_limit(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(live_feed))
        .route("/map", get(map_view))
        .route("/analytics", get(analytics))
        .route("/system", get(system_info))
        .route("/healthz", get(|| async { "ok" }))
        .route("/export", get(export))
        .route("/api/analytics", get(analytics_json))
        .route("/report", post(report_hazard))
        .route("/control/play", post(play))
        .route("/control/pause", post(pause))
        .route("/privacy", post(toggle_privacy))
        .route("/media/camera", post(start_camera))
        .route("/media/stop-camera", post(stop_camera))
        .route(
            "/media/upload",
            post(upload_video).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/media/stop-video", post(stop_video))
        .route(VIDEO_ROUTE, get(current_video))
        .with_state(state)
}

// --- Pages ---

async fn live_feed(State(state): State<AppState>) -> Html<String> {
    let (recent, refresh_secs) = {
        let pipeline = state.pipeline.read().await;
        (pipeline.recent(), pipeline.config().live_tick.as_secs().max(1))
    };
    let model = {
        let session = state.session.lock().await;
        LiveModel {
            mode: session.mode(),
            privacy_mode: session.privacy_mode(),
            status: session.status_label(),
            video_url: (session.mode() == FeedMode::DemoVideo).then(|| VIDEO_ROUTE.to_string()),
            latest: session.latest().cloned(),
            recent,
            notices: session.notices().iter().take(NOTICES_SHOWN).cloned().collect(),
            refresh_secs,
        }
    };
    Html(pages::live_page(model))
}

async fn map_view(State(state): State<AppState>, Query(query): Query<FilterQuery>) -> Html<String> {
    let params = query.params();
    let show_landmarks = query.show_landmarks();
    let model = {
        let pipeline = state.pipeline.read().await;
        let view = pipeline.view(&params);
        MapModel {
            layers: MapLayers::build(&view.detections, show_landmarks),
            counts: view.counts,
            params,
            show_landmarks,
            refresh_secs: pipeline.config().ambient_tick.as_secs().max(1),
        }
    };
    Html(pages::map_page(model))
}

async fn analytics(State(state): State<AppState>) -> Html<String> {
    let (summary, refresh_secs) = {
        let pipeline = state.pipeline.read().await;
        (pipeline.analytics(), pipeline.config().ambient_tick.as_secs().max(1))
    };
    let privacy_mode = state.session.lock().await.privacy_mode();
    Html(pages::analytics_page(AnalyticsModel {
        summary,
        privacy_mode,
        refresh_secs,
    }))
}

async fn analytics_json(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(state.pipeline.read().await.analytics())
}

async fn system_info(State(state): State<AppState>) -> Html<String> {
    let model = {
        let pipeline = state.pipeline.read().await;
        SystemModel {
            stored: pipeline.store().len(),
            capacity: pipeline.store().capacity(),
            next_id: pipeline.next_id(),
            live_tick_secs: pipeline.config().live_tick.as_secs_f64(),
            ambient_tick_secs: pipeline.config().ambient_tick.as_secs_f64(),
            playing: state.control.is_playing(),
            camera_device: state.open_camera().describe(),
        }
    };
    Html(pages::system_page(model))
}

async fn export(State(state): State<AppState>, Query(query): Query<FilterQuery>) -> Response {
    let params = query.params();
    match state.pipeline.read().await.export_json(&params) {
        Ok(json) => {
            info!(selected = %params.selected_type, "export downloaded");
            (
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                    ),
                ],
                json,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// --- Actions ---

async fn report_hazard(State(state): State<AppState>, Form(form): Form<ReportForm>) -> Redirect {
    let selected = TypeSelector::parse(&form.hazard_type);
    state.pipeline.write().await.report_hazard(&selected);
    match selected.hazard_type() {
        Some(hazard_type) => Redirect::to(&format!("/map?type={}", pages::query_escape(hazard_type.label()))),
        None => Redirect::to("/map"),
    }
}

async fn play(State(state): State<AppState>) -> Redirect {
    state.control.play();
    state.session.lock().await.set_live(true);
    Redirect::to("/")
}

async fn pause(State(state): State<AppState>) -> Redirect {
    state.control.pause();
    state.session.lock().await.set_live(false);
    Redirect::to("/")
}

async fn toggle_privacy(State(state): State<AppState>) -> Redirect {
    let mut session = state.session.lock().await;
    let enabled = !session.privacy_mode();
    session.set_privacy_mode(enabled);
    info!(enabled, "privacy mode toggled");
    Redirect::to("/")
}

async fn start_camera(State(state): State<AppState>) -> Redirect {
    let device = state.open_camera();
    let mut session = state.session.lock().await;
    match session.start_camera(device) {
        Ok(()) => state.control.play(),
        Err(e) => warn!(error = %e, "camera unavailable"),
    }
    Redirect::to("/")
}

async fn stop_camera(State(state): State<AppState>) -> Redirect {
    if state.session.lock().await.stop_camera() {
        state.control.pause();
    }
    Redirect::to("/")
}

async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, (StatusCode, String)> {
    let (name, data) = match read_video_field(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return Err((StatusCode::BAD_REQUEST, "missing 'video' field".to_string())),
        Err(e) => {
            warn!(error = %e, "demo video upload failed");
            state
                .session
                .lock()
                .await
                .push_notice(Notice::error("Unable to load video").with_description(e.to_string()));
            return Ok(Redirect::to("/"));
        }
    };

    let mut session = state.session.lock().await;
    match session.load_video(&name, data.to_vec()) {
        Ok(url) => {
            info!(%name, %url, bytes = data.len(), "demo video loaded");
            state.control.play();
        }
        Err(e) => {
            warn!(%name, error = %e, "demo video rejected");
            session.push_notice(Notice::error("Unable to load video").with_description(e.to_string()));
        }
    }
    Ok(Redirect::to("/"))
}

/// The first `video` field's file name and bytes, or `None` if the form has none.
async fn read_video_field(multipart: &mut Multipart) -> Result<Option<(String, Bytes)>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("video") {
            continue;
        }
        let name = field.file_name().unwrap_or("video").to_string();
        let data = field.bytes().await?;
        return Ok(Some((name, data)));
    }
    Ok(None)
}

async fn stop_video(State(state): State<AppState>) -> Redirect {
    let mut session = state.session.lock().await;
    if session.stop_video() {
        state.control.pause();
        session.push_notice(Notice::plain("Video stopped"));
    }
    Redirect::to("/")
}

/// Serves the uploaded demo video to the page's `<video>` element. A single
/// `Range: bytes=` request gets a 206 so the player can seek.
async fn current_video(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let blob = {
        let session = state.session.lock().await;
        session
            .video_sink()
            .and_then(|url| session.blobs().resolve(&url))
    };
    let Some(blob) = blob else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let total = blob.data.len();
    let content_type = content_type_for(&blob.name);
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .filter(|raw| !raw.contains(','));

    match range.map(|raw| byte_range(raw, total)) {
        None => (
            [(header::CONTENT_TYPE, content_type), (header::ACCEPT_RANGES, "bytes")],
            Bytes::copy_from_slice(&blob.data),
        )
            .into_response(),
        Some(Some((start, end))) => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, total)),
            ],
            Bytes::copy_from_slice(&blob.data[start..=end]),
        )
            .into_response(),
        Some(None) => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", total))],
        )
            .into_response(),
    }
}

/// Resolves one `bytes=start-end`, `bytes=start-` or `bytes=-suffix` range against
/// a body of `total` bytes. Returns inclusive bounds, or `None` if unsatisfiable.
fn byte_range(raw: &str, total: usize) -> Option<(usize, usize)> {
    let spec = raw.trim().strip_prefix("bytes=")?;
    if total == 0 {
        return None;
    }
    let last = total - 1;
    let (start, end) = match spec.split_once('-')? {
        (start, end) if start.trim().is_empty() => {
            let suffix: usize = end.trim().parse().ok()?;
            if suffix == 0 {
                return None;
            }
            (total.saturating_sub(suffix), last)
        }
        (start, end) if end.trim().is_empty() => (start.trim().parse().ok()?, last),
        (start, end) => (
            start.trim().parse().ok()?,
            end.trim().parse::<usize>().ok()?.min(last),
        ),
    };
    (start <= end).then_some((start, end))
}

fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".webm") {
        "video/webm"
    } else if lower.ends_with(".ogg") || lower.ends_with(".ogv") {
        "video/ogg"
    } else if lower.ends_with(".mp4") || lower.ends_with(".m4v") {
        "video/mp4"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_match_the_map_page() {
        let query = FilterQuery::default();
        assert_eq!(query.params(), FilterParams::default());
        assert!(query.show_landmarks());
    }

    #[test]
    fn landmarks_switch_off() {
        for raw in ["off", "OFF", "false", "0", "hide"] {
            let query = FilterQuery {
                landmarks: Some(raw.to_string()),
                ..FilterQuery::default()
            };
            assert!(!query.show_landmarks(), "{raw}");
        }
    }

    #[test]
    fn blank_or_malformed_severity_uses_default() {
        for raw in ["", "abc", "  "] {
            let query = FilterQuery {
                severity: Some(raw.to_string()),
                ..FilterQuery::default()
            };
            assert_eq!(query.params().severity_threshold, DEFAULT_SEVERITY_THRESHOLD, "{raw:?}");
        }
        let query = FilterQuery {
            severity: Some(" 0.451 ".to_string()),
            ..FilterQuery::default()
        };
        assert_eq!(query.params().severity_threshold, 0.451);
    }

    #[test]
    fn byte_ranges() {
        assert_eq!(byte_range("bytes=0-9", 100), Some((0, 9)));
        assert_eq!(byte_range("bytes=90-", 100), Some((90, 99)));
        assert_eq!(byte_range("bytes=-10", 100), Some((90, 99)));
        assert_eq!(byte_range("bytes=-500", 100), Some((0, 99)));
        assert_eq!(byte_range("bytes=50-500", 100), Some((50, 99)));
        assert_eq!(byte_range("bytes=100-", 100), None);
        assert_eq!(byte_range("bytes=9-3", 100), None);
        assert_eq!(byte_range("bytes=-0", 100), None);
        assert_eq!(byte_range("items=0-9", 100), None);
        assert_eq!(byte_range("bytes=0-0", 0), None);
    }

    #[test]
    fn video_content_types() {
        assert_eq!(content_type_for("Road.MP4"), "video/mp4");
        assert_eq!(content_type_for("clip.webm"), "video/webm");
        assert_eq!(content_type_for("clip"), "application/octet-stream");
    }
}
