//! Shared domain and wire types for the bazaar order core.
//!
//! Every type that crosses a crate boundary (service ↔ store, service ↔ daemon)
//! lives here. JSON field names are camelCase to match the public API; the
//! same encoding is used for the jsonb columns that hold frozen line items and
//! payment obligations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PurchaseStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a purchase. `Unpaid -> Paid` is the only legal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Unpaid,
    Paid,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Unpaid => "unpaid",
            PurchaseStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PurchaseStatus::Unpaid),
            "paid" => Some(PurchaseStatus::Paid),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ContactType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Email,
    Phone,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Email => "email",
            ContactType::Phone => "phone",
        }
    }

    /// Exact, case-sensitive match.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(ContactType::Email),
            "phone" => Some(ContactType::Phone),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Purchase request (raw wire form + normalized form)
// ---------------------------------------------------------------------------

/// Purchase request exactly as decoded from the client.
///
/// Every field defaults so that a missing key surfaces as a field-level
/// validation failure instead of a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPurchaseRequest {
    pub purchased_items: Vec<RawPurchaseItem>,
    pub sender_name: String,
    pub sender_contact_type: String,
    pub sender_contact_detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPurchaseItem {
    pub product_id: String,
    pub qty: i64,
}

/// One validated line of a purchase request. Input only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseItemRequest {
    pub product_id: Uuid,
    /// Always >= 1 once validated.
    pub quantity: i64,
}

/// A purchase request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub items: Vec<PurchaseItemRequest>,
    pub sender_name: String,
    pub sender_contact_type: ContactType,
    pub sender_contact_detail: String,
}

// ---------------------------------------------------------------------------
// Collaborator rows
// ---------------------------------------------------------------------------

/// Current catalog facts for a product, as read inside a store transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    /// Unit price in the smallest currency unit.
    pub price: i64,
    pub sku: String,
    pub stock: i64,
    pub seller_id: Uuid,
    pub file_id: Option<Uuid>,
}

/// Bank-transfer destination of a seller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_account_name: String,
    pub bank_account_holder: String,
    pub bank_account_number: String,
}

/// File metadata as returned by the file service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub id: Uuid,
    #[serde(default)]
    pub file_uri: String,
    #[serde(default)]
    pub file_thumbnail_uri: String,
}

// ---------------------------------------------------------------------------
// Frozen purchase
// ---------------------------------------------------------------------------

/// Product facts frozen at purchase time. Later catalog edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedItemSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(rename = "qty")]
    pub quantity: i64,
    #[serde(rename = "price")]
    pub unit_price: i64,
    pub sku: String,
    pub file_id: Option<Uuid>,
    pub seller_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchasedItemSnapshot {
    /// `unit_price * quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// What one seller is owed for their share of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentObligation {
    pub seller_id: Uuid,
    pub bank_account_name: String,
    pub bank_account_holder: String,
    pub bank_account_number: String,
    pub total_price: i64,
}

/// Aggregate root. After creation only `status` and `updated_at` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub purchased_items: Vec<PurchasedItemSnapshot>,
    pub payment_obligations: Vec<PaymentObligation>,
    pub total_price: i64,
    pub status: PurchaseStatus,
    pub sender_name: String,
    pub sender_contact_type: ContactType,
    pub sender_contact_detail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Response view
// ---------------------------------------------------------------------------

/// A frozen line item plus display URIs resolved after the fact.
///
/// URIs are best-effort: empty when the product had no file or the file
/// service could not resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedItemView {
    #[serde(flatten)]
    pub snapshot: PurchasedItemSnapshot,
    pub file_uri: String,
    pub file_thumbnail_uri: String,
}

/// Public shape of a purchase, returned by create and read-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    pub purchase_id: Uuid,
    pub purchased_items: Vec<PurchasedItemView>,
    pub total_price: i64,
    pub payment_details: Vec<PaymentObligation>,
    pub status: PurchaseStatus,
    pub sender_name: String,
    pub sender_contact_type: ContactType,
    pub sender_contact_detail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseView {
    /// View with every URI left empty.
    pub fn unresolved(p: Purchase) -> Self {
        let purchased_items = p
            .purchased_items
            .into_iter()
            .map(|snapshot| PurchasedItemView {
                snapshot,
                file_uri: String::new(),
                file_thumbnail_uri: String::new(),
            })
            .collect();

        Self {
            purchase_id: p.id,
            purchased_items,
            total_price: p.total_price,
            payment_details: p.payment_obligations,
            status: p.status,
            sender_name: p.sender_name,
            sender_contact_type: p.sender_contact_type,
            sender_contact_detail: p.sender_contact_detail,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
