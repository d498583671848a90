//! Purchase initiation: eligibility, push-payment prompt, pending record.

use chrono::Local;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::{eligibility, phone, Catalog, Transaction};
use crate::error::AppError;
use crate::ports::{PaymentGateway, PushRequest};
use crate::store::TransactionStore;
use crate::validation::{required_field, PACKAGE_ID_MAX_LEN, PHONE_INPUT_MAX_LEN};

#[derive(Debug)]
pub struct PurchaseInput {
    pub phone: Option<String>,
    pub package_id: Option<String>,
}

#[derive(Debug)]
pub struct PurchaseOutput {
    pub transaction_id: String,
    pub provider_response: Value,
}

#[derive(Clone)]
pub struct PaymentService {
    catalog: Arc<Catalog>,
    store: Arc<TransactionStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<TransactionStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            store,
            gateway,
        }
    }

    pub async fn initiate(&self, input: PurchaseInput) -> Result<PurchaseOutput, AppError> {
        let raw_phone = required_field("phone", input.phone.as_deref(), PHONE_INPUT_MAX_LEN)?;
        let package_id =
            required_field("packageId", input.package_id.as_deref(), PACKAGE_ID_MAX_LEN)?;

        let phone = phone::normalize(&raw_phone);
        if !phone.is_canonical() {
            tracing::warn!(phone = %phone, "Purchase for unrecognized phone format");
        }
        let phone = phone.into_string();

        let package = self
            .catalog
            .find(&package_id)
            .ok_or_else(|| AppError::PackageNotFound(package_id.clone()))?;

        let history = self.store.history(&phone).await;
        if eligibility::is_blocked(&history, package, Local::now().date_naive()) {
            tracing::info!(package_id = %package.id, "Purchase denied, already purchased today");
            return Err(AppError::AlreadyPurchasedToday);
        }

        let request = PushRequest {
            phone: phone.clone(),
            amount: package.price,
            account_reference: package.id.clone(),
        };
        let provider_response = self.gateway.initiate_push(&request).await.map_err(|e| {
            tracing::error!(package_id = %package.id, "Failed to initiate payment: {}", e);
            AppError::InitiationFailed(e)
        })?;

        let tx = Transaction::pending(phone, package, provider_response.clone());
        let transaction_id = tx.id.clone();
        self.store.append(tx).await?;

        tracing::info!(
            tx_id = %transaction_id,
            package_id = %package.id,
            amount = package.price,
            "Payment initiated"
        );

        Ok(PurchaseOutput {
            transaction_id,
            provider_response,
        })
    }
}
