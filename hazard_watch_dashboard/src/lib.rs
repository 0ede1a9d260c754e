// THEORY:
// `hazard_watch_dashboard` puts the hazard engine behind a small web server.
// The engine (`HazardPipeline` plus the `LiveFeed` timers) and the live-page
// session are assembled by `Dashboard::launch`; `start_server` binds the axum
// router over that state. Pages are leptos components rendered to strings on
// every request, so the browser always sees a snapshot of the current state.
//
// Everything that needs axum or leptos sits behind the `web` feature; without it
// the state and configuration types still build and `start_server` reports that
// the server is unavailable.

pub mod config;
pub mod state;

#[cfg(feature = "web")]
pub mod pages;
#[cfg(feature = "web")]
pub mod routes;

pub use config::{DEFAULT_MAX_UPLOAD_BYTES, ServerConfig};
pub use state::{AppState, CameraFactory, ControlHandle, Dashboard, device_camera};

#[cfg(feature = "web")]
pub async fn start_server(state: AppState, cfg: &ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    use anyhow::Context;

    let app = routes::router_with_upload_limit(state, cfg.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding dashboard to {}", cfg.bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, camera = %cfg.camera_device.display(), "dashboard listening on http://{}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "dashboard server stopped");
        }
    });

    Ok(server)
}

#[cfg(not(feature = "web"))]
pub async fn start_server(_state: AppState, _cfg: &ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    Err(anyhow::anyhow!("web feature not enabled for hazard_watch_dashboard"))
}
