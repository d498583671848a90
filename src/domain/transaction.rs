//! Transaction domain entity.
//! One purchase attempt, from push-payment prompt to provisioning outcome.

use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::package::Package;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 8;

/// Provider's success sentinel in confirmation callbacks.
pub const RESULT_CODE_SUCCESS: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Outcome reported by the provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// Raw push-payment response; carries the correlation token.
    pub mpesa: Value,
    pub phone: String,
    pub package_id: String,
    pub amount: u32,
    pub status: TransactionStatus,
    /// Calendar day of purchase, used by the eligibility window.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision: Option<ProvisionResult>,
}

impl Transaction {
    pub fn pending(phone: String, package: &Package, provider_response: Value) -> Self {
        Self {
            id: generate_id(),
            mpesa: provider_response,
            phone,
            package_id: package.id.clone(),
            amount: package.price,
            status: TransactionStatus::Pending,
            date: Local::now().date_naive(),
            created_at: Utc::now(),
            result_code: None,
            result_desc: None,
            confirmation: None,
            provision: None,
        }
    }

    pub fn correlation_token(&self) -> Option<&str> {
        checkout_request_id(&self.mpesa)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies the confirmation outcome. Returns the new status.
    pub fn settle(
        &mut self,
        result_code: Option<i64>,
        result_desc: Option<String>,
        confirmation: Value,
    ) -> TransactionStatus {
        self.status = if result_code == Some(RESULT_CODE_SUCCESS) {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failed
        };
        self.result_code = result_code;
        self.result_desc = result_desc;
        self.confirmation = Some(confirmation);
        self.status
    }
}

/// Reads `CheckoutRequestID` from a push-payment response, either at the
/// top level or nested under `data`.
pub fn checkout_request_id(response: &Value) -> Option<&str> {
    response
        .get("CheckoutRequestID")
        .or_else(|| response.get("data").and_then(|d| d.get("CheckoutRequestID")))
        .and_then(Value::as_str)
}

pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
