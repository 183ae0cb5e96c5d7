//! `bzr purchase show`: read a purchase back exactly as the daemon serves it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bzr_config::ServiceConfig;
use bzr_db::PgStore;
use bzr_purchase::{HttpFileResolver, PurchaseService};
use sqlx::PgPool;

pub async fn show(pool: PgPool, cfg: &ServiceConfig, purchase_id: &str) -> Result<String> {
    let files = HttpFileResolver::new(
        &cfg.files.base_url,
        Duration::from_secs(cfg.files.timeout_secs),
    )?;
    let service = PurchaseService::new(Arc::new(PgStore::new(pool)), Arc::new(files))
        .with_timeout(Duration::from_secs(cfg.purchase.request_timeout_secs));

    let view = service.get_purchase(purchase_id).await?;
    Ok(serde_json::to_string_pretty(&view)?)
}
