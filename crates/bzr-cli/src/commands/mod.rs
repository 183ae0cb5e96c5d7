//! Command handler modules for bzr-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod catalog;
pub mod purchase;

use anyhow::{Context, Result};
use bzr_config::{load_service_config, LoadedConfig, ServiceConfig};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config (all defaults when `paths` is empty) and apply env
/// overrides.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, ServiceConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let (loaded, mut cfg) = load_service_config(&path_refs)?;
    cfg.apply_env_overrides();
    cfg.validate()?;
    Ok((loaded, cfg))
}

/// Connect using the env var the config names for the database URL.
pub async fn connect(cfg: &ServiceConfig) -> Result<PgPool> {
    bzr_db::connect_from_env_var(&cfg.database.url_env, cfg.database.max_connections)
        .await
        .with_context(|| format!("connect via {}", cfg.database.url_env))
}
