//! Framework-agnostic purchase domain.

pub mod confirmation;
pub mod eligibility;
pub mod package;
pub mod phone;
pub mod transaction;

pub use confirmation::StkCallback;
pub use package::{Catalog, Package};
pub use phone::PhoneNumber;
pub use transaction::{ProvisionResult, Transaction, TransactionStatus};
