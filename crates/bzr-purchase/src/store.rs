//! Storage boundary for purchases and the product rows they read.
//!
//! The service only ever talks to storage through these traits. A
//! [`StoreTx`] is one atomic unit: dropping it without [`StoreTx::commit`]
//! must discard every write made through it. Both the Postgres store and the
//! in-memory test store honour that contract.

use anyhow::Result;
use async_trait::async_trait;
use bzr_schemas::{BankDetails, ProductRow, Purchase};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    Applied,
    /// Live stock is below the requested quantity; nothing was written.
    Insufficient { available: i64 },
    /// The product row no longer exists.
    Missing,
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Open a new atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    /// Read a committed purchase without locking it.
    async fn fetch_purchase(&self, id: Uuid) -> Result<Option<Purchase>>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn product_by_id(&mut self, id: Uuid) -> Result<Option<ProductRow>>;

    /// Seller payout destination. Runs on the transaction's own connection;
    /// a failed lookup must leave the transaction usable.
    async fn seller_bank_details(&mut self, seller_id: Uuid) -> Result<Option<BankDetails>>;

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()>;

    /// Read a purchase and hold it exclusively until commit or drop.
    async fn purchase_for_update(&mut self, id: Uuid) -> Result<Option<Purchase>>;

    /// Decrement live stock only if `stock >= qty`.
    async fn decrement_stock(&mut self, product_id: Uuid, qty: i64) -> Result<StockDecrement>;

    async fn mark_paid(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
