//! Closed error taxonomy for purchase operations.
//!
//! Every failure a caller can observe is one [`PurchaseError`] variant with a
//! stable [`ErrorKind`] code. Transport status codes are derived from the kind
//! in exactly one place (the daemon's response mapping); nothing downstream
//! inspects message strings.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON path of the offending field (e.g. `purchasedItems[1].qty`).
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Stable, machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ProductNotFound,
    InsufficientStock,
    PurchaseNotFound,
    AlreadyPaid,
    ProofCountMismatch,
    InvalidFileReference,
    StockUpdateFailed,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ProductNotFound => "product_not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::PurchaseNotFound => "purchase_not_found",
            ErrorKind::AlreadyPaid => "already_paid",
            ErrorKind::ProofCountMismatch => "proof_count_mismatch",
            ErrorKind::InvalidFileReference => "invalid_file_reference",
            ErrorKind::StockUpdateFailed => "stock_update_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: Uuid },

    #[error("insufficient stock for product {name} ({product_id}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        name: String,
        requested: i64,
        available: i64,
    },

    /// `purchase_id` is kept as the caller supplied it; it may not be a UUID.
    #[error("purchase not found: {purchase_id}")]
    PurchaseNotFound { purchase_id: String },

    #[error("purchase {purchase_id} is already paid")]
    AlreadyPaid { purchase_id: Uuid },

    #[error("expected {expected} payment proof files, got {received}")]
    ProofCountMismatch { expected: usize, received: usize },

    #[error("invalid or non-existent file ids: {}", .file_ids.join(", "))]
    InvalidFileReference { file_ids: Vec<String> },

    #[error("failed to reduce stock for product {product_id}: {reason}")]
    StockUpdateFailed { product_id: Uuid, reason: String },

    #[error("request timed out")]
    Timeout,

    /// Infrastructure failure. The message is opaque; the source chain is for logs only.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl PurchaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PurchaseError::Validation(_) => ErrorKind::Validation,
            PurchaseError::ProductNotFound { .. } => ErrorKind::ProductNotFound,
            PurchaseError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            PurchaseError::PurchaseNotFound { .. } => ErrorKind::PurchaseNotFound,
            PurchaseError::AlreadyPaid { .. } => ErrorKind::AlreadyPaid,
            PurchaseError::ProofCountMismatch { .. } => ErrorKind::ProofCountMismatch,
            PurchaseError::InvalidFileReference { .. } => ErrorKind::InvalidFileReference,
            PurchaseError::StockUpdateFailed { .. } => ErrorKind::StockUpdateFailed,
            PurchaseError::Timeout => ErrorKind::Timeout,
            PurchaseError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn purchase_not_found(purchase_id: impl Into<String>) -> Self {
        PurchaseError::PurchaseNotFound {
            purchase_id: purchase_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_display_does_not_leak_source() {
        let e = PurchaseError::from(anyhow::anyhow!("password authentication failed for user"));
        assert_eq!(e.to_string(), "internal error");
        assert_eq!(e.kind(), ErrorKind::Internal);
    }

    #[test]
    fn proof_count_mismatch_reports_both_counts() {
        let e = PurchaseError::ProofCountMismatch {
            expected: 2,
            received: 1,
        };
        assert_eq!(e.to_string(), "expected 2 payment proof files, got 1");
    }

    #[test]
    fn kind_codes_are_snake_case() {
        assert_eq!(ErrorKind::InsufficientStock.as_str(), "insufficient_stock");
        let json = serde_json::to_value(ErrorKind::AlreadyPaid).unwrap();
        assert_eq!(json, "already_paid");
    }
}
