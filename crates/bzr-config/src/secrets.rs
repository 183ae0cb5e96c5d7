//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (e.g. `database.url_env:
//! "BZR_DATABASE_URL"`). Secrets are resolved once at startup and passed into
//! constructors. `Debug` redacts values, and errors name the variable, never
//! its contents.

use anyhow::{bail, Result};

use crate::ServiceConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Postgres connection URL.
    pub database_url: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .finish()
    }
}

/// Resolve every secret the service needs from the process environment.
pub fn resolve_secrets(cfg: &ServiceConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_from(cfg, |name| std::env::var(name).ok())
}

/// Same as [`resolve_secrets`] with an injectable lookup.
pub fn resolve_secrets_from(
    cfg: &ServiceConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedSecrets> {
    let var = cfg.database.url_env.trim();
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => Ok(ResolvedSecrets { database_url: v }),
        _ => bail!("SECRETS_MISSING: required env var '{var}' (database url) is not set or empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_names_the_variable() {
        let cfg = ServiceConfig::default();
        let err = resolve_secrets_from(&cfg, |_| None).unwrap_err();
        assert!(err.to_string().contains("BZR_DATABASE_URL"));
    }

    #[test]
    fn debug_never_prints_the_url() {
        let cfg = ServiceConfig::default();
        let s = resolve_secrets_from(&cfg, |_| {
            Some("postgres://bzr:hunter2@db/bzr".to_string())
        })
        .unwrap();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<REDACTED>"));
    }
}
