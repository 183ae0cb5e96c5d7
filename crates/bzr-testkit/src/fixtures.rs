//! Builders for sellers, products and requests used across scenario tests.

use std::sync::Arc;
use std::time::Duration;

use bzr_purchase::PurchaseService;
use bzr_schemas::{BankDetails, ProductRow, RawPurchaseItem, RawPurchaseRequest};
use uuid::Uuid;

use crate::files::MemoryFileResolver;
use crate::memory_store::MemoryStore;

pub fn bank(bank_name: &str, holder: &str, number: &str) -> BankDetails {
    BankDetails {
        bank_account_name: bank_name.to_string(),
        bank_account_holder: holder.to_string(),
        bank_account_number: number.to_string(),
    }
}

pub fn product(seller_id: Uuid, name: &str, price: i64, stock: i64) -> ProductRow {
    let id = Uuid::new_v4();
    ProductRow {
        id,
        name: name.to_string(),
        category: "groceries".to_string(),
        price,
        sku: format!("SKU-{}", &id.simple().to_string()[..8]),
        stock,
        seller_id,
        file_id: None,
    }
}

/// A request that passes validation, buying `(product_id, qty)` lines.
pub fn raw_request(lines: &[(Uuid, i64)]) -> RawPurchaseRequest {
    RawPurchaseRequest {
        purchased_items: lines
            .iter()
            .map(|(id, qty)| RawPurchaseItem {
                product_id: id.to_string(),
                qty: *qty,
            })
            .collect(),
        sender_name: "Siti Rahma".to_string(),
        sender_contact_type: "phone".to_string(),
        sender_contact_detail: "+62 812 3456 789".to_string(),
    }
}

/// Service wired to in-memory collaborators.
pub struct Harness {
    pub store: MemoryStore,
    pub files: Arc<MemoryFileResolver>,
    pub service: PurchaseService,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let files = Arc::new(MemoryFileResolver::new());
        let service = PurchaseService::new(Arc::new(store.clone()), files.clone());
        Self {
            store,
            files,
            service,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.service = self.service.with_timeout(timeout);
        self
    }

    /// Seed a seller with bank details and return its id.
    pub fn seller(&self, holder: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .put_seller(id, bank("BCA", holder, &format!("80{}", &id.simple().to_string()[..8])));
        id
    }

    /// Seed a product and return its id.
    pub async fn product(&self, seller_id: Uuid, name: &str, price: i64, stock: i64) -> Uuid {
        let p = product(seller_id, name, price, stock);
        let id = p.id;
        self.store.put_product(p).await;
        id
    }

    /// Seed a product whose picture lives in the file service.
    pub async fn product_with_file(
        &self,
        seller_id: Uuid,
        name: &str,
        price: i64,
        stock: i64,
    ) -> (Uuid, Uuid) {
        let mut p = product(seller_id, name, price, stock);
        let file_id = self.files.add_file();
        p.file_id = Some(file_id);
        let id = p.id;
        self.store.put_product(p).await;
        (id, file_id)
    }

    /// `n` registered proof files, as the strings a client would send.
    pub fn proof_files(&self, n: usize) -> Vec<String> {
        (0..n).map(|_| self.files.add_file().to_string()).collect()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
