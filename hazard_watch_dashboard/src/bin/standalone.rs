use hazard_watch::HazardPipeline;
use hazard_watch_dashboard::{Dashboard, ServerConfig, device_camera, start_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "hazard_watch=info,hazard_watch_dashboard=info".into()),
        )
        .init();

    let cfg = ServerConfig::from_env();
    let dashboard = Dashboard::launch(
        HazardPipeline::new(cfg.pipeline.clone()),
        device_camera(cfg.camera_device.clone()),
    );

    let handle = start_server(dashboard.state.clone(), &cfg).await?;
    tokio::select! {
        _ = handle => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    dashboard.shutdown().await;
    Ok(())
}
