//! Seams between the purchase engine and the outside world.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Package, ProvisionResult};
use crate::mpesa::MpesaError;
use crate::store::Ledger;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable snapshot storage for the transaction ledger.
#[async_trait]
pub trait TransactionPersistence: Send + Sync {
    async fn load(&self) -> StoreResult<Ledger>;
    async fn save(&self, ledger: &Ledger) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub phone: String,
    pub amount: u32,
    pub account_reference: String,
}

/// Starts a push-payment prompt on the payer's handset.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the provider's raw response, which carries `CheckoutRequestID`.
    async fn initiate_push(&self, request: &PushRequest) -> Result<Value, MpesaError>;

    fn circuit_state(&self) -> String {
        "closed".to_string()
    }
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Provisioning request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provisioning rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Provisioning failed: {0}")]
    Failed(String),
}

/// Delivers a paid bundle to a number.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(
        &self,
        phone: &str,
        package: &Package,
    ) -> Result<ProvisionResult, ProvisioningError>;
}
