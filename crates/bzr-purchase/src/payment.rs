//! Payment aggregation: frozen line items → one obligation per seller.
//!
//! Everything here is a pure function over immutable inputs. Bank details are
//! resolved by the caller beforehand and passed in as a lookup table, so the
//! aggregation itself can never fail on a missing seller profile.

use std::collections::BTreeMap;

use bzr_schemas::{BankDetails, PaymentObligation, PurchasedItemSnapshot};
use thiserror::Error;
use uuid::Uuid;

/// Money arithmetic left the `i64` range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("money arithmetic overflow")]
pub struct MoneyOverflow;

/// Fold line items into `seller_id -> Σ unit_price × quantity`.
pub fn seller_totals(
    items: &[PurchasedItemSnapshot],
) -> Result<BTreeMap<Uuid, i64>, MoneyOverflow> {
    items.iter().try_fold(BTreeMap::new(), |mut totals, item| {
        let line = item.line_total().ok_or(MoneyOverflow)?;
        let running = totals.entry(item.seller_id).or_insert(0_i64);
        *running = running.checked_add(line).ok_or(MoneyOverflow)?;
        Ok(totals)
    })
}

/// One obligation per seller, ordered by seller id.
///
/// Sellers absent from `bank_details` get empty bank fields.
pub fn build_obligations(
    totals: &BTreeMap<Uuid, i64>,
    bank_details: &BTreeMap<Uuid, BankDetails>,
) -> Vec<PaymentObligation> {
    totals
        .iter()
        .map(|(seller_id, total)| {
            let bank = bank_details.get(seller_id).cloned().unwrap_or_default();
            PaymentObligation {
                seller_id: *seller_id,
                bank_account_name: bank.bank_account_name,
                bank_account_holder: bank.bank_account_holder,
                bank_account_number: bank.bank_account_number,
                total_price: *total,
            }
        })
        .collect()
}

pub fn grand_total(obligations: &[PaymentObligation]) -> Result<i64, MoneyOverflow> {
    obligations
        .iter()
        .try_fold(0_i64, |acc, o| acc.checked_add(o.total_price).ok_or(MoneyOverflow))
}
