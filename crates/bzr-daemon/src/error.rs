//! Error → HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bzr_purchase::{ErrorKind, PurchaseError};
use serde_json::json;
use tracing::{error, warn};

use crate::api_types::ErrorResponse;

/// Status code for an error kind. The only place this mapping exists.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation
        | ErrorKind::ProofCountMismatch
        | ErrorKind::InvalidFileReference
        | ErrorKind::ProductNotFound => StatusCode::BAD_REQUEST,
        ErrorKind::PurchaseNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock | ErrorKind::AlreadyPaid | ErrorKind::StockUpdateFailed => {
            StatusCode::CONFLICT
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug)]
pub enum ApiError {
    Purchase(PurchaseError),
    /// Body was not JSON or did not fit the request shape.
    BadBody(JsonRejection),
}

impl From<PurchaseError> for ApiError {
    fn from(e: PurchaseError) -> Self {
        ApiError::Purchase(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadBody(e)
    }
}

/// Build the client-facing body. Internal errors are opaque.
pub fn error_body(err: &PurchaseError) -> ErrorResponse {
    let kind = err.kind();
    match err {
        PurchaseError::Validation(fields) => ErrorResponse {
            fields: fields.clone(),
            ..ErrorResponse::new(kind, err.to_string())
        },
        PurchaseError::ProductNotFound { product_id } => ErrorResponse {
            details: Some(json!({ "productId": product_id })),
            ..ErrorResponse::new(kind, err.to_string())
        },
        PurchaseError::InsufficientStock {
            product_id,
            requested,
            available,
            ..
        } => ErrorResponse {
            details: Some(json!({
                "productId": product_id,
                "requested": requested,
                "available": available,
            })),
            ..ErrorResponse::new(kind, err.to_string())
        },
        PurchaseError::ProofCountMismatch { expected, received } => ErrorResponse {
            details: Some(json!({ "expected": expected, "received": received })),
            ..ErrorResponse::new(kind, err.to_string())
        },
        PurchaseError::InvalidFileReference { file_ids } => ErrorResponse {
            details: Some(json!({ "fileIds": file_ids })),
            ..ErrorResponse::new(kind, err.to_string())
        },
        PurchaseError::StockUpdateFailed { product_id, .. } => ErrorResponse {
            details: Some(json!({ "productId": product_id })),
            ..ErrorResponse::new(kind, err.to_string())
        },
        PurchaseError::Internal(_) => ErrorResponse::new(kind, "internal server error"),
        PurchaseError::PurchaseNotFound { .. }
        | PurchaseError::AlreadyPaid { .. }
        | PurchaseError::Timeout => ErrorResponse::new(kind, err.to_string()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Purchase(err) => {
                let kind = err.kind();
                match &err {
                    PurchaseError::Internal(source) => {
                        error!(kind = kind.as_str(), error = %format!("{source:#}"), "request failed");
                    }
                    other => warn!(kind = kind.as_str(), error = %other, "request rejected"),
                }
                (status_for(kind), Json(error_body(&err))).into_response()
            }
            ApiError::BadBody(rejection) => {
                warn!(error = %rejection.body_text(), "malformed request body");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(ErrorKind::Validation, "invalid request body")),
                )
                    .into_response()
            }
        }
    }
}
