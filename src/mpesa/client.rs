use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::MpesaConfig;
use crate::domain::transaction::checkout_request_id;
use crate::ports::{PaymentGateway, PushRequest};

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";
const TRANSACTION_DESC_PREFIX: &str = "Royford Data Deals";

#[derive(Error, Debug)]
pub enum MpesaError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Access token request failed: {0}")]
    Auth(String),
    #[error("STK push rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid response from M-PESA: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// STK push request body, field names as the Daraja API expects them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushPayload<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'a str,
    amount: u32,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    call_back_url: &'a str,
    account_reference: &'a str,
    transaction_desc: String,
}

/// HTTP client for the M-PESA OAuth and STK push endpoints
#[derive(Clone)]
pub struct MpesaClient {
    client: Client,
    config: MpesaConfig,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig) -> Self {
        Self::with_circuit_breaker(config, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        config: MpesaConfig,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        MpesaClient {
            client,
            config,
            circuit_breaker,
        }
    }

    /// Fetches a short-lived OAuth token using the consumer key and secret
    pub async fn access_token(&self) -> Result<String, MpesaError> {
        fetch_access_token(&self.client, &self.config).await
    }

    /// Sends the STK push prompt and returns the provider's raw response
    pub async fn stk_push(&self, request: &PushRequest) -> Result<Value, MpesaError> {
        let client = self.client.clone();
        let config = self.config.clone();
        let request = request.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let token = fetch_access_token(&client, &config).await?;
                send_stk_push(&client, &config, &token, &request, Local::now()).await
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(FailsafeError::Rejected) => Err(MpesaError::CircuitBreakerOpen(
                "M-PESA circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[async_trait]
impl PaymentGateway for MpesaClient {
    async fn initiate_push(&self, request: &PushRequest) -> Result<Value, MpesaError> {
        self.stk_push(request).await
    }

    fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}

async fn fetch_access_token(client: &Client, config: &MpesaConfig) -> Result<String, MpesaError> {
    let url = format!(
        "{}/oauth/v1/generate?grant_type=client_credentials",
        config.base_url.trim_end_matches('/')
    );
    let credentials = STANDARD.encode(format!(
        "{}:{}",
        config.consumer_key, config.consumer_secret
    ));

    let response = client
        .get(&url)
        .header(reqwest::header::AUTHORIZATION, format!("Basic {}", credentials))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MpesaError::Auth(format!("status {}: {}", status.as_u16(), body)));
    }

    let token = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| MpesaError::Auth(format!("malformed token response: {}", e)))?;
    Ok(token.access_token)
}

async fn send_stk_push(
    client: &Client,
    config: &MpesaConfig,
    token: &str,
    request: &PushRequest,
    now: DateTime<Local>,
) -> Result<Value, MpesaError> {
    let url = format!(
        "{}/mpesa/stkpush/v1/processrequest",
        config.base_url.trim_end_matches('/')
    );
    let timestamp = timestamp(now);
    let payload = StkPushPayload {
        business_short_code: &config.shortcode,
        password: stk_password(&config.shortcode, &config.passkey, &timestamp),
        timestamp,
        transaction_type: TRANSACTION_TYPE,
        amount: request.amount,
        party_a: &request.phone,
        party_b: &config.shortcode,
        phone_number: &request.phone,
        call_back_url: &config.callback_url,
        account_reference: &request.account_reference,
        transaction_desc: format!("{} {}", TRANSACTION_DESC_PREFIX, request.account_reference),
    };

    let response = client
        .post(&url)
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MpesaError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.json::<Value>().await?;
    if checkout_request_id(&body).is_none() {
        return Err(MpesaError::InvalidResponse(
            "response has no CheckoutRequestID".to_string(),
        ));
    }

    tracing::info!(
        checkout_request_id = checkout_request_id(&body).unwrap_or_default(),
        amount = request.amount,
        account_reference = %request.account_reference,
        "STK push accepted"
    );
    Ok(body)
}

/// `YYYYMMDDHHmmss` as the STK API expects it.
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// base64(shortcode ++ passkey ++ timestamp)
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}
