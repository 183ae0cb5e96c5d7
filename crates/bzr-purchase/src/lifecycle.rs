//! Purchase status state machine.
//!
//! ```text
//!   create ──► Unpaid ──(payment proof accepted)──► Paid (terminal)
//! ```
//!
//! `Unpaid -> Paid` is the only legal edge. A repeated proof upload lands on
//! `Paid -> Paid`, which is refused, so stock is never deducted twice.

use bzr_schemas::PurchaseStatus;

/// Returned when a requested status change is not a legal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: PurchaseStatus,
    pub to: PurchaseStatus,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "illegal purchase transition: {} -> {}",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl std::error::Error for IllegalTransition {}

pub fn transition(
    from: PurchaseStatus,
    to: PurchaseStatus,
) -> Result<PurchaseStatus, IllegalTransition> {
    match (from, to) {
        (PurchaseStatus::Unpaid, PurchaseStatus::Paid) => Ok(to),
        _ => Err(IllegalTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaid_to_paid_is_the_only_legal_edge() {
        use PurchaseStatus::*;
        assert_eq!(transition(Unpaid, Paid), Ok(Paid));
        for (from, to) in [(Paid, Paid), (Paid, Unpaid), (Unpaid, Unpaid)] {
            assert_eq!(transition(from, to), Err(IllegalTransition { from, to }));
        }
    }

    #[test]
    fn display_names_both_states() {
        let e = IllegalTransition {
            from: PurchaseStatus::Paid,
            to: PurchaseStatus::Paid,
        };
        assert_eq!(e.to_string(), "illegal purchase transition: paid -> paid");
    }
}
