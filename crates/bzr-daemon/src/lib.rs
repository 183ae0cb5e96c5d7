//! HTTP surface for the purchase service.
//!
//! Handlers are thin: decode the body, call [`bzr_purchase::PurchaseService`],
//! and map the result. Status codes are derived from the error kind in
//! [`error`] and nowhere else.

pub mod api_types;
pub mod error;
pub mod routes;
pub mod state;
