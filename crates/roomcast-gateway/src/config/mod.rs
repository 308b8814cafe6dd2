//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::PathBuf;

use roomcast_core::error::{Result, RoomcastError};

pub use schema::{GatewayConfig, GatewaySection, SessionsSection};

/// Overrides `sessions.cache_dir` when set and non-empty.
pub const CACHE_DIR_ENV: &str = "CACHE_DIR";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RoomcastError::Internal(format!("read config failed: {e}")))?;
    let mut cfg = load_from_str(&s)?;
    apply_env(&mut cfg, std::env::var(CACHE_DIR_ENV).ok());
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| RoomcastError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply a `CACHE_DIR` value read from the environment.
pub fn apply_env(cfg: &mut GatewayConfig, cache_dir: Option<String>) {
    if let Some(dir) = cache_dir.filter(|d| !d.is_empty()) {
        tracing::debug!(cache_dir = %dir, "cache dir overridden by environment");
        cfg.sessions.cache_dir = PathBuf::from(dir);
    }
}
