//! Axum router and all HTTP handlers for bzr-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests in `tests/` compose the bare router directly.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bzr_purchase::PROOF_ACCEPTED_MESSAGE;
use bzr_schemas::{PurchaseView, RawPurchaseRequest};
use tracing::warn;

use crate::{
    api_types::{HealthResponse, MessageResponse, PaymentProofRequest, ReadyResponse},
    error::ApiError,
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/ready", get(ready))
        .route("/v1/purchase", post(create_purchase))
        .route(
            "/v1/purchase/:purchase_id",
            get(get_purchase).post(upload_payment_proof),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health, GET /v1/ready
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

pub(crate) async fn ready(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    match st.purchases.ping().await {
        Ok(()) => (StatusCode::OK, Json(ReadyResponse { ready: true })),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse { ready: false }),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/purchase
// ---------------------------------------------------------------------------

pub(crate) async fn create_purchase(
    State(st): State<Arc<AppState>>,
    body: Result<Json<RawPurchaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PurchaseView>), ApiError> {
    let Json(raw) = body?;
    let view = st.purchases.create_purchase(&raw).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

// ---------------------------------------------------------------------------
// GET /v1/purchase/{purchaseId}
// ---------------------------------------------------------------------------

pub(crate) async fn get_purchase(
    State(st): State<Arc<AppState>>,
    Path(purchase_id): Path<String>,
) -> Result<Json<PurchaseView>, ApiError> {
    let view = st.purchases.get_purchase(&purchase_id).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// POST /v1/purchase/{purchaseId}
// ---------------------------------------------------------------------------

pub(crate) async fn upload_payment_proof(
    State(st): State<Arc<AppState>>,
    Path(purchase_id): Path<String>,
    body: Result<Json<PaymentProofRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(req) = body?;
    st.purchases
        .upload_payment_proof(&purchase_id, &req.file_ids)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: PROOF_ACCEPTED_MESSAGE.to_string(),
        }),
    ))
}
