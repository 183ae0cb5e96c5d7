//! Order-processing core: validation, creation, payment aggregation and
//! payment-proof fulfillment of marketplace purchases.
//!
//! Storage and the file service sit behind traits ([`PurchaseStore`],
//! [`FileResolver`]); Postgres lives in `bzr-db`, in-memory fakes in
//! `bzr-testkit`.

pub mod error;
pub mod files;
pub mod lifecycle;
pub mod payment;
pub mod service;
pub mod store;
pub mod validate;

pub use error::{ErrorKind, FieldError, PurchaseError};
pub use files::{FileLookupError, FileResolver, HttpFileResolver};
pub use lifecycle::{transition, IllegalTransition};
pub use payment::{build_obligations, grand_total, seller_totals, MoneyOverflow};
pub use service::{PurchaseService, DEFAULT_TIMEOUT, PROOF_ACCEPTED_MESSAGE};
pub use store::{PurchaseStore, StockDecrement, StoreTx};
pub use validate::{validate_proof_file_ids, validate_purchase_request};
