pub mod payments;
pub mod provisioning;
pub mod reconciler;

pub use payments::{PaymentService, PurchaseInput, PurchaseOutput};
pub use provisioning::{HttpProvisioner, SimulatedProvisioner};
pub use reconciler::{CallbackReconciler, MatchKind, MatchOutcome, Reconciliation};
