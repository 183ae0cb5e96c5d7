//! bzr-daemon entry point.
//!
//! Thin on purpose: load config, set up tracing, build the service, wire
//! middleware, and serve. Handlers live in `routes.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use bzr_config::{
    load_service_config, report_unused_keys, secrets::resolve_secrets, ServerConfig,
    UnusedKeyPolicy,
};
use bzr_daemon::{routes, state::AppState};
use bzr_db::PgStore;
use bzr_purchase::{HttpFileResolver, PurchaseService};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Comma-separated list of YAML config layers, base first.
const ENV_CONFIG_PATHS: &str = "BZR_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let (loaded, mut cfg) = load_service_config(&path_refs).context("load config")?;

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &unused.unused_leaf_pointers {
        warn!(pointer = %pointer, "config key is not read by bzr-daemon");
    }

    cfg.apply_env_overrides();
    cfg.validate()?;
    let secrets = resolve_secrets(&cfg)?;

    let pool = bzr_db::connect(&secrets.database_url, cfg.database.max_connections).await?;
    let store = PgStore::new(pool);
    let files = HttpFileResolver::new(
        &cfg.files.base_url,
        Duration::from_secs(cfg.files.timeout_secs),
    )?;
    let purchases = PurchaseService::new(Arc::new(store), Arc::new(files))
        .with_timeout(Duration::from_secs(cfg.purchase.request_timeout_secs));

    let shared = Arc::new(AppState::new(purchases).with_config_hash(loaded.config_hash.clone()));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_config(&cfg.server));

    let addr: SocketAddr = cfg
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", cfg.server.bind_addr))?;
    info!(
        config_hash = %loaded.config_hash,
        files = %cfg.files.base_url,
        "bzr-daemon listening on http://{}",
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn config_paths_from_env() -> Vec<String> {
    std::env::var(ENV_CONFIG_PATHS)
        .ok()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// CORS: allow only the configured origins.
fn cors_from_config(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
