//! Shared daemon state.

use bzr_purchase::PurchaseService;

/// Static build metadata reported by `/v1/health`.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "bzr-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub purchases: PurchaseService,
    /// Hash of the effective config, echoed by `/v1/health` when known.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(purchases: PurchaseService) -> Self {
        Self {
            build: BuildInfo::default(),
            purchases,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}
