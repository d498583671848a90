use chrono::NaiveDate;

use super::package::Package;
use super::transaction::{Transaction, TransactionStatus};

/// Whether a purchase of `package` is blocked for a number with `history` on `today`.
///
/// Only `SUCCESS` entries dated `today` count. Pending attempts never block,
/// so several prompts for the same package can be outstanding at once.
pub fn is_blocked(history: &[Transaction], package: &Package, today: NaiveDate) -> bool {
    if package.allow_multiple {
        return false;
    }

    history
        .iter()
        .any(|tx| tx.date == today && tx.status == TransactionStatus::Success)
}
