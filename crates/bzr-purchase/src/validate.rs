//! Structural validation of incoming requests.
//!
//! Pure functions: no I/O, no clock. All failures are collected so the client
//! can fix every field in one round trip.

use std::sync::OnceLock;

use bzr_schemas::{ContactType, PurchaseItemRequest, PurchaseRequest, RawPurchaseRequest};
use regex::Regex;
use uuid::Uuid;

use crate::error::FieldError;

pub const SENDER_NAME_MIN_CHARS: usize = 4;
pub const SENDER_NAME_MAX_CHARS: usize = 55;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
// Whitespace is ASCII `[\t\n\f\r ]` only; Unicode spaces are rejected.
const PHONE_PATTERN: &str = r"^\+?[0-9\t\n\f\r \-()]{7,15}$";

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PHONE_PATTERN).expect("phone pattern is a valid regex"))
}

/// Validate and normalize a raw purchase request.
pub fn validate_purchase_request(
    raw: &RawPurchaseRequest,
) -> Result<PurchaseRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    if raw.purchased_items.is_empty() {
        errors.push(FieldError::new(
            "purchasedItems",
            "purchasedItems must contain at least one item",
        ));
    }

    let mut items = Vec::with_capacity(raw.purchased_items.len());
    for (i, item) in raw.purchased_items.iter().enumerate() {
        let product_id = parse_product_id(&item.product_id);
        if product_id.is_none() {
            errors.push(FieldError::new(
                format!("purchasedItems[{i}].productId"),
                "productId must be a valid product identifier",
            ));
        }
        if item.qty < 1 {
            errors.push(FieldError::new(
                format!("purchasedItems[{i}].qty"),
                "qty must be at least 1",
            ));
        }
        if let Some(product_id) = product_id {
            items.push(PurchaseItemRequest {
                product_id,
                quantity: item.qty,
            });
        }
    }

    let name_chars = raw.sender_name.chars().count();
    if !(SENDER_NAME_MIN_CHARS..=SENDER_NAME_MAX_CHARS).contains(&name_chars) {
        errors.push(FieldError::new(
            "senderName",
            format!(
                "senderName must be {SENDER_NAME_MIN_CHARS}-{SENDER_NAME_MAX_CHARS} characters"
            ),
        ));
    }

    let contact_type = ContactType::parse(&raw.sender_contact_type);
    if contact_type.is_none() {
        errors.push(FieldError::new(
            "senderContactType",
            "senderContactType must be 'email' or 'phone'",
        ));
    }

    if raw.sender_contact_detail.is_empty() {
        errors.push(FieldError::new(
            "senderContactDetail",
            "senderContactDetail is required",
        ));
    } else if let Some(ct) = contact_type {
        if let Some(msg) = contact_detail_error(ct, &raw.sender_contact_detail) {
            errors.push(FieldError::new("senderContactDetail", msg));
        }
    }

    match contact_type {
        Some(sender_contact_type) if errors.is_empty() => Ok(PurchaseRequest {
            items,
            sender_name: raw.sender_name.clone(),
            sender_contact_type,
            sender_contact_detail: raw.sender_contact_detail.clone(),
        }),
        _ => Err(errors),
    }
}

/// Validate the file-id list of a payment-proof upload.
pub fn validate_proof_file_ids(file_ids: &[String]) -> Result<(), Vec<FieldError>> {
    if file_ids.is_empty() {
        return Err(vec![FieldError::new("fileIds", "fileIds must not be empty")]);
    }

    let errors: Vec<FieldError> = file_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| id.trim().is_empty())
        .map(|(i, _)| FieldError::new(format!("fileIds[{i}]"), "file id must not be blank"))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The nil UUID is never a real product.
fn parse_product_id(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s.trim()).ok().filter(|id| !id.is_nil())
}

fn contact_detail_error(ct: ContactType, detail: &str) -> Option<&'static str> {
    match ct {
        ContactType::Email if !email_re().is_match(detail) => Some("invalid email format"),
        ContactType::Phone if !phone_re().is_match(detail) => Some("invalid phone number format"),
        _ => None,
    }
}
