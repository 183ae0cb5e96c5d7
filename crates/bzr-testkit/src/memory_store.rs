//! In-memory [`PurchaseStore`] for scenario tests.
//!
//! A transaction takes the state lock for its whole lifetime and works on a
//! staged copy. `commit` writes the copy back; dropping the transaction
//! discards it. Holding the lock serializes transactions the same way a row
//! lock would, which is all the purchase workflow relies on.
//!
//! [`MemoryStore::limit_connections`] models a bounded pool: an open
//! transaction holds one connection until commit or drop, and every
//! non-transactional read borrows one for its duration.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bzr_purchase::{PurchaseStore, StockDecrement, StoreTx};
use bzr_schemas::{BankDetails, ProductRow, Purchase, PurchaseStatus};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: BTreeMap<Uuid, ProductRow>,
    pub purchases: BTreeMap<Uuid, Purchase>,
}

/// Injected failures. Each flag stays set until cleared.
#[derive(Debug, Clone, Default)]
struct Faults {
    fail_commit: bool,
    fail_bank_lookup: bool,
    unreachable: bool,
    insert_delay: Option<Duration>,
    decrement_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<AsyncMutex<MemoryState>>,
    // Read-only for the workflow, so kept out of the staged copy.
    sellers: Arc<Mutex<BTreeMap<Uuid, BankDetails>>>,
    faults: Arc<Mutex<Faults>>,
    connections: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- seeding ---------------------------------------------------------

    pub fn put_seller(&self, seller_id: Uuid, bank: BankDetails) {
        lock(&self.sellers).insert(seller_id, bank);
    }

    pub async fn put_product(&self, product: ProductRow) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn remove_product(&self, product_id: Uuid) {
        self.state.lock().await.products.remove(&product_id);
    }

    pub async fn set_stock(&self, product_id: Uuid, stock: i64) {
        if let Some(p) = self.state.lock().await.products.get_mut(&product_id) {
            p.stock = stock;
        }
    }

    /// Simulates a catalog edit made after a purchase was taken.
    pub async fn edit_product(&self, product_id: Uuid, name: &str, price: i64) {
        if let Some(p) = self.state.lock().await.products.get_mut(&product_id) {
            p.name = name.to_string();
            p.price = price;
        }
    }

    // --- inspection ------------------------------------------------------

    pub async fn stock(&self, product_id: Uuid) -> Option<i64> {
        self.state
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }

    pub async fn purchase(&self, id: Uuid) -> Option<Purchase> {
        self.state.lock().await.purchases.get(&id).cloned()
    }

    pub async fn purchase_count(&self) -> usize {
        self.state.lock().await.purchases.len()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    // --- fault injection -------------------------------------------------

    pub fn fail_commits(&self, on: bool) {
        lock(&self.faults).fail_commit = on;
    }

    pub fn fail_bank_lookups(&self, on: bool) {
        lock(&self.faults).fail_bank_lookup = on;
    }

    pub fn set_unreachable(&self, on: bool) {
        lock(&self.faults).unreachable = on;
    }

    /// Every `insert_purchase` sleeps this long before writing.
    pub fn delay_inserts(&self, delay: Option<Duration>) {
        lock(&self.faults).insert_delay = delay;
    }

    /// Every `decrement_stock` sleeps this long before writing.
    pub fn delay_decrements(&self, delay: Option<Duration>) {
        lock(&self.faults).decrement_delay = delay;
    }

    /// Cap concurrent connections, as a database pool would.
    pub fn limit_connections(&self, max: usize) {
        *lock(&self.connections) = Some(Arc::new(Semaphore::new(max)));
    }

    fn faults(&self) -> Faults {
        lock(&self.faults).clone()
    }

    async fn connection(&self) -> Result<Option<OwnedSemaphorePermit>> {
        let pool = lock(&self.connections).clone();
        match pool {
            Some(sem) => Ok(Some(
                sem.acquire_owned()
                    .await
                    .map_err(|_| anyhow!("connection pool closed"))?,
            )),
            None => Ok(None),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let faults = self.faults();
        if faults.unreachable {
            bail!("memory store unreachable");
        }
        let conn = self.connection().await?;
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            sellers: self.sellers.clone(),
            faults,
            _conn: conn,
        }))
    }

    async fn fetch_purchase(&self, id: Uuid) -> Result<Option<Purchase>> {
        if self.faults().unreachable {
            bail!("memory store unreachable");
        }
        let _conn = self.connection().await?;
        Ok(self.state.lock().await.purchases.get(&id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        if self.faults().unreachable {
            bail!("memory store unreachable");
        }
        let _conn = self.connection().await?;
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    sellers: Arc<Mutex<BTreeMap<Uuid, BankDetails>>>,
    faults: Faults,
    _conn: Option<OwnedSemaphorePermit>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn product_by_id(&mut self, id: Uuid) -> Result<Option<ProductRow>> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn seller_bank_details(&mut self, seller_id: Uuid) -> Result<Option<BankDetails>> {
        if self.faults.fail_bank_lookup {
            return Err(anyhow!("seller profile lookup failed"));
        }
        Ok(lock(&self.sellers).get(&seller_id).cloned())
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        if let Some(delay) = self.faults.insert_delay {
            tokio::time::sleep(delay).await;
        }
        if self.staged.purchases.contains_key(&purchase.id) {
            bail!("duplicate purchase id {}", purchase.id);
        }
        self.staged.purchases.insert(purchase.id, purchase.clone());
        Ok(())
    }

    async fn purchase_for_update(&mut self, id: Uuid) -> Result<Option<Purchase>> {
        Ok(self.staged.purchases.get(&id).cloned())
    }

    async fn decrement_stock(&mut self, product_id: Uuid, qty: i64) -> Result<StockDecrement> {
        if let Some(delay) = self.faults.decrement_delay {
            tokio::time::sleep(delay).await;
        }
        let Some(product) = self.staged.products.get_mut(&product_id) else {
            return Ok(StockDecrement::Missing);
        };
        if product.stock < qty {
            return Ok(StockDecrement::Insufficient {
                available: product.stock,
            });
        }
        product.stock -= qty;
        Ok(StockDecrement::Applied)
    }

    async fn mark_paid(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let purchase = self
            .staged
            .purchases
            .get_mut(&id)
            .ok_or_else(|| anyhow!("purchase {id} not found"))?;
        purchase.status = PurchaseStatus::Paid;
        purchase.updated_at = at;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx {
            mut guard,
            staged,
            faults,
            ..
        } = *self;
        if faults.fail_commit {
            bail!("injected commit failure");
        }
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn dropped_tx_discards_staged_writes() {
        let store = MemoryStore::new();
        let p = fixtures::product(Uuid::new_v4(), "Kopi", 10_000, 5);
        store.put_product(p.clone()).await;

        {
            let mut tx = store.begin().await.unwrap();
            assert_eq!(
                tx.decrement_stock(p.id, 3).await.unwrap(),
                StockDecrement::Applied
            );
        }

        assert_eq!(store.stock(p.id).await, Some(5));
    }

    #[tokio::test]
    async fn commit_publishes_staged_writes() {
        let store = MemoryStore::new();
        let p = fixtures::product(Uuid::new_v4(), "Teh", 8_000, 2);
        store.put_product(p.clone()).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.decrement_stock(p.id, 3).await.unwrap(),
            StockDecrement::Insufficient { available: 2 }
        );
        assert_eq!(
            tx.decrement_stock(Uuid::new_v4(), 1).await.unwrap(),
            StockDecrement::Missing
        );
        tx.decrement_stock(p.id, 2).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock(p.id).await, Some(0));
    }

    #[tokio::test]
    async fn failed_commit_leaves_state_untouched() {
        let store = MemoryStore::new();
        let p = fixtures::product(Uuid::new_v4(), "Gula", 15_000, 4);
        store.put_product(p.clone()).await;
        store.fail_commits(true);

        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(p.id, 1).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert_eq!(store.stock(p.id).await, Some(4));
    }

    #[tokio::test]
    async fn open_tx_holds_its_connection() {
        let store = MemoryStore::new();
        let seller = Uuid::new_v4();
        store.put_seller(seller, fixtures::bank("BNI", "Rina", "0099"));
        store.limit_connections(1);

        let mut tx = store.begin().await.unwrap();
        // The lookup rides on the transaction's connection.
        let bank = tx.seller_bank_details(seller).await.unwrap().unwrap();
        assert_eq!(bank.bank_account_holder, "Rina");

        let starved = tokio::time::timeout(Duration::from_millis(50), store.ping()).await;
        assert!(starved.is_err(), "pool of one must be exhausted by the open tx");

        drop(tx);
        store.ping().await.unwrap();
    }
}
