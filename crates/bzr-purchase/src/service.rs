//! Purchase orchestration: creation, payment-proof fulfillment, read-back.
//!
//! Every public operation runs under a request-scoped deadline. When the
//! deadline fires the in-flight future is dropped; an open [`StoreTx`] is
//! dropped with it, which rolls back every write it staged.
//!
//! [`StoreTx`]: crate::store::StoreTx

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use bzr_schemas::{
    BankDetails, Purchase, PurchaseRequest, PurchaseStatus, PurchaseView, PurchasedItemSnapshot,
    PurchasedItemView, RawPurchaseRequest,
};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PurchaseError;
use crate::files::{FileLookupError, FileResolver};
use crate::lifecycle::transition;
use crate::payment::{build_obligations, grand_total, seller_totals, MoneyOverflow};
use crate::store::{PurchaseStore, StockDecrement, StoreTx};
use crate::validate::{validate_proof_file_ids, validate_purchase_request};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Message returned to the client once a proof has been accepted.
pub const PROOF_ACCEPTED_MESSAGE: &str =
    "payment proof processed successfully, purchase marked as paid and stock reduced";

#[derive(Clone)]
pub struct PurchaseService {
    store: Arc<dyn PurchaseStore>,
    files: Arc<dyn FileResolver>,
    timeout: Duration,
}

impl PurchaseService {
    pub fn new(store: Arc<dyn PurchaseStore>, files: Arc<dyn FileResolver>) -> Self {
        Self {
            store,
            files,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Storage connectivity, for readiness probes.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.store.ping().await
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    pub async fn create_purchase(
        &self,
        raw: &RawPurchaseRequest,
    ) -> Result<PurchaseView, PurchaseError> {
        let request = validate_purchase_request(raw).map_err(PurchaseError::Validation)?;
        let purchase = self.bounded("create_purchase", self.create_in_tx(request)).await?;

        info!(
            purchase_id = %purchase.id,
            total_price = purchase.total_price,
            items = purchase.purchased_items.len(),
            sellers = purchase.payment_obligations.len(),
            "purchase created"
        );

        // Enrichment is after commit and outside the deadline.
        Ok(self.enrich(purchase).await)
    }

    async fn create_in_tx(&self, request: PurchaseRequest) -> Result<Purchase, PurchaseError> {
        let mut tx = self.store.begin().await?;
        let now = Utc::now();

        let mut requested: BTreeMap<Uuid, i64> = BTreeMap::new();
        let mut snapshots = Vec::with_capacity(request.items.len());

        for item in &request.items {
            let product = tx
                .product_by_id(item.product_id)
                .await?
                .ok_or(PurchaseError::ProductNotFound {
                    product_id: item.product_id,
                })?;

            let cumulative = requested.entry(product.id).or_insert(0);
            *cumulative = cumulative
                .checked_add(item.quantity)
                .ok_or_else(|| anyhow!("requested quantity overflow for product {}", product.id))?;

            if *cumulative > product.stock {
                warn!(
                    product_id = %product.id,
                    requested = *cumulative,
                    available = product.stock,
                    "purchase rejected: insufficient stock"
                );
                return Err(PurchaseError::InsufficientStock {
                    product_id: product.id,
                    name: product.name,
                    requested: *cumulative,
                    available: product.stock,
                });
            }

            snapshots.push(PurchasedItemSnapshot {
                product_id: product.id,
                name: product.name,
                category: product.category,
                quantity: item.quantity,
                unit_price: product.price,
                sku: product.sku,
                file_id: product.file_id,
                seller_id: product.seller_id,
                created_at: now,
                updated_at: now,
            });
        }

        let totals = seller_totals(&snapshots)?;
        let banks = bank_table(&mut *tx, totals.keys().copied()).await;
        let payment_obligations = build_obligations(&totals, &banks);
        let total_price = grand_total(&payment_obligations)?;

        let purchase = Purchase {
            id: Uuid::now_v7(),
            purchased_items: snapshots,
            payment_obligations,
            total_price,
            status: PurchaseStatus::Unpaid,
            sender_name: request.sender_name,
            sender_contact_type: request.sender_contact_type,
            sender_contact_detail: request.sender_contact_detail,
            created_at: now,
            updated_at: now,
        };

        tx.insert_purchase(&purchase).await?;
        tx.commit().await?;
        Ok(purchase)
    }

    // -----------------------------------------------------------------------
    // Payment proof
    // -----------------------------------------------------------------------

    /// Accept payment proof for an unpaid purchase, deduct stock, mark it paid.
    pub async fn upload_payment_proof(
        &self,
        purchase_id: &str,
        file_ids: &[String],
    ) -> Result<(), PurchaseError> {
        validate_proof_file_ids(file_ids).map_err(PurchaseError::Validation)?;
        let id = parse_purchase_id(purchase_id)?;
        self.bounded("upload_payment_proof", self.pay_in_tx(id, file_ids))
            .await
    }

    async fn pay_in_tx(&self, id: Uuid, file_ids: &[String]) -> Result<(), PurchaseError> {
        let purchase = self
            .store
            .fetch_purchase(id)
            .await?
            .ok_or_else(|| PurchaseError::purchase_not_found(id.to_string()))?;

        if transition(purchase.status, PurchaseStatus::Paid).is_err() {
            warn!(purchase_id = %id, "payment proof rejected: already paid");
            return Err(PurchaseError::AlreadyPaid { purchase_id: id });
        }

        let expected = purchase.payment_obligations.len();
        if file_ids.len() != expected {
            warn!(purchase_id = %id, expected, received = file_ids.len(), "payment proof rejected: count mismatch");
            return Err(PurchaseError::ProofCountMismatch {
                expected,
                received: file_ids.len(),
            });
        }

        let parsed = parse_file_ids(file_ids)?;
        match self.files.validate_exist(&parsed).await {
            Ok(()) => {}
            Err(FileLookupError::Missing(ids)) => {
                warn!(purchase_id = %id, missing = ?ids, "payment proof rejected: unknown files");
                return Err(PurchaseError::InvalidFileReference { file_ids: ids });
            }
            Err(FileLookupError::Unavailable(err)) => {
                return Err(PurchaseError::Internal(
                    err.context("payment proof file validation failed"),
                ));
            }
        }

        let mut tx = self.store.begin().await?;

        // A concurrent proof may have won between the read above and this lock.
        let locked = tx
            .purchase_for_update(id)
            .await?
            .ok_or_else(|| PurchaseError::purchase_not_found(id.to_string()))?;
        let next = transition(locked.status, PurchaseStatus::Paid)
            .map_err(|_| PurchaseError::AlreadyPaid { purchase_id: id })?;

        for item in &locked.purchased_items {
            let reason = match tx.decrement_stock(item.product_id, item.quantity).await? {
                StockDecrement::Applied => continue,
                StockDecrement::Insufficient { available } => format!(
                    "insufficient stock: requested {}, available {}",
                    item.quantity, available
                ),
                StockDecrement::Missing => "product no longer exists".to_string(),
            };
            warn!(purchase_id = %id, product_id = %item.product_id, %reason, "payment proof rejected: stock update failed");
            return Err(PurchaseError::StockUpdateFailed {
                product_id: item.product_id,
                reason,
            });
        }

        tx.mark_paid(id, Utc::now()).await?;
        tx.commit().await?;

        info!(
            purchase_id = %id,
            status = next.as_str(),
            items = locked.purchased_items.len(),
            "payment proof accepted"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read-back
    // -----------------------------------------------------------------------

    pub async fn get_purchase(&self, purchase_id: &str) -> Result<PurchaseView, PurchaseError> {
        let id = parse_purchase_id(purchase_id)?;
        let purchase = self
            .bounded("get_purchase", async {
                self.store.fetch_purchase(id).await.map_err(PurchaseError::from)
            })
            .await?
            .ok_or_else(|| PurchaseError::purchase_not_found(purchase_id))?;
        Ok(self.enrich(purchase).await)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, PurchaseError>
    where
        F: Future<Output = Result<T, PurchaseError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "operation timed out; rolled back");
                Err(PurchaseError::Timeout)
            }
        }
    }

    /// Attach display URIs. Each distinct file id is resolved once; failures
    /// leave the URIs empty.
    async fn enrich(&self, purchase: Purchase) -> PurchaseView {
        let wanted: BTreeSet<Uuid> = purchase
            .purchased_items
            .iter()
            .filter_map(|item| item.file_id)
            .collect();

        let mut resolved = BTreeMap::new();
        for file_id in wanted {
            match self.files.resolve(file_id).await {
                Ok(meta) => {
                    resolved.insert(file_id, meta);
                }
                Err(err) => {
                    debug!(%file_id, error = %err, "file uri enrichment skipped");
                }
            }
        }

        let mut view = PurchaseView::unresolved(purchase);
        for item in &mut view.purchased_items {
            fill_uris(item, &resolved);
        }
        view
    }
}

/// Lenient: a failed or empty lookup leaves the seller out of the table.
async fn bank_table(
    tx: &mut dyn StoreTx,
    sellers: impl Iterator<Item = Uuid>,
) -> BTreeMap<Uuid, BankDetails> {
    let mut table = BTreeMap::new();
    for seller_id in sellers {
        match tx.seller_bank_details(seller_id).await {
            Ok(Some(details)) => {
                table.insert(seller_id, details);
            }
            Ok(None) => {
                warn!(%seller_id, "seller has no bank details; obligation left blank");
            }
            Err(err) => {
                warn!(%seller_id, error = %format!("{err:#}"), "seller bank lookup failed; obligation left blank");
            }
        }
    }
    table
}

fn fill_uris(item: &mut PurchasedItemView, resolved: &BTreeMap<Uuid, bzr_schemas::FileMeta>) {
    if let Some(meta) = item.snapshot.file_id.and_then(|id| resolved.get(&id)) {
        item.file_uri = meta.file_uri.clone();
        item.file_thumbnail_uri = meta.file_thumbnail_uri.clone();
    }
}

/// Unparseable ids cannot name an existing purchase.
fn parse_purchase_id(raw: &str) -> Result<Uuid, PurchaseError> {
    Uuid::parse_str(raw.trim()).map_err(|_| PurchaseError::purchase_not_found(raw))
}

fn parse_file_ids(file_ids: &[String]) -> Result<Vec<Uuid>, PurchaseError> {
    let mut parsed = Vec::with_capacity(file_ids.len());
    let mut invalid = Vec::new();
    for raw in file_ids {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => parsed.push(id),
            Err(_) => invalid.push(raw.clone()),
        }
    }
    if invalid.is_empty() {
        Ok(parsed)
    } else {
        Err(PurchaseError::InvalidFileReference { file_ids: invalid })
    }
}

impl From<MoneyOverflow> for PurchaseError {
    fn from(e: MoneyOverflow) -> Self {
        PurchaseError::Internal(anyhow!(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_uuid_purchase_id_is_not_found() {
        let err = parse_purchase_id("order-42").unwrap_err();
        assert!(matches!(err, PurchaseError::PurchaseNotFound { ref purchase_id } if purchase_id == "order-42"));
    }

    #[test]
    fn file_ids_that_are_not_uuids_are_collected() {
        let good = Uuid::new_v4().to_string();
        let err = parse_file_ids(&[good, "x".to_string(), "y".to_string()]).unwrap_err();
        match err {
            PurchaseError::InvalidFileReference { file_ids } => {
                assert_eq!(file_ids, vec!["x".to_string(), "y".to_string()])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn money_overflow_is_internal() {
        let err = PurchaseError::from(MoneyOverflow);
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }
}
