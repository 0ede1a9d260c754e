//! Server configuration, read from `HW_*` environment variables.

use hazard_watch::PipelineConfig;
use hazard_watch::core_modules::media::DEFAULT_CAMERA_DEVICE;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
/// Largest demo video `/media/upload` accepts.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub camera_device: PathBuf,
    pub max_upload_bytes: usize,
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            camera_device: PathBuf::from(DEFAULT_CAMERA_DEVICE),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`. Empty or malformed values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(bind) = get("HW_BIND") {
            cfg.bind_addr = bind;
        }
        if let Some(device) = get("HW_CAMERA_DEVICE") {
            cfg.camera_device = PathBuf::from(device);
        }
        if let Some(bytes) = parse::<usize>("HW_MAX_UPLOAD_BYTES", get("HW_MAX_UPLOAD_BYTES")) {
            cfg.max_upload_bytes = bytes.max(1);
        }
        if let Some(capacity) = parse::<usize>("HW_STORE_CAPACITY", get("HW_STORE_CAPACITY")) {
            cfg.pipeline.store_capacity = capacity.max(1);
        }
        if let Some(ms) = parse::<u64>("HW_LIVE_TICK_MS", get("HW_LIVE_TICK_MS")) {
            cfg.pipeline.live_tick = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = parse::<u64>("HW_AMBIENT_TICK_MS", get("HW_AMBIENT_TICK_MS")) {
            cfg.pipeline.ambient_tick = Duration::from_millis(ms.max(1));
        }
        if let Some(seed) = parse::<u64>("HW_SEED", get("HW_SEED")) {
            cfg.pipeline.seed = Some(seed);
        }
        cfg
    }
}

fn parse<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring malformed setting");
            None
        }
    }
}
