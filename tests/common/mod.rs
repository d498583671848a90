#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bundle_pay::adapters::InMemoryPersistence;
use bundle_pay::domain::{Catalog, Package, ProvisionResult};
use bundle_pay::mpesa::MpesaError;
use bundle_pay::ports::{
    PaymentGateway, Provisioner, ProvisioningError, PushRequest, StoreResult,
    TransactionPersistence,
};
use bundle_pay::store::{Ledger, TransactionStore};
use bundle_pay::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Gateway that hands out `ws_CO_<n>` tokens, or fails on demand.
#[derive(Default)]
pub struct FakeGateway {
    pub fail: AtomicBool,
    pub requests: Mutex<Vec<PushRequest>>,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<PushRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initiate_push(&self, request: &PushRequest) -> Result<Value, MpesaError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MpesaError::Auth("status 401: invalid credentials".into()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(json!({
            "MerchantRequestID": format!("m-{}", requests.len()),
            "CheckoutRequestID": format!("ws_CO_{}", requests.len()),
            "ResponseCode": "0",
            "CustomerMessage": "Success. Request accepted for processing"
        }))
    }
}

/// Records every provisioning call.
#[derive(Default)]
pub struct RecordingProvisioner {
    pub fail: AtomicBool,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl RecordingProvisioner {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn provision(
        &self,
        phone: &str,
        package: &Package,
    ) -> Result<ProvisionResult, ProvisioningError> {
        self.calls
            .lock()
            .unwrap()
            .push((phone.to_string(), package.id.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProvisioningError::Failed("gateway down".into()));
        }
        Ok(ProvisionResult {
            success: true,
            message: "delivered".into(),
        })
    }
}

/// Persistence whose saves can be switched to fail, either all of them or
/// only the save with a given 1-based attempt number.
#[derive(Default)]
pub struct FlakyPersistence {
    pub inner: InMemoryPersistence,
    pub fail_saves: AtomicBool,
    pub fail_attempt: AtomicUsize,
    pub attempts: AtomicUsize,
}

#[async_trait]
impl TransactionPersistence for FlakyPersistence {
    async fn load(&self) -> StoreResult<Ledger> {
        self.inner.load().await
    }

    async fn save(&self, ledger: &Ledger) -> StoreResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_saves.load(Ordering::SeqCst)
            || attempt == self.fail_attempt.load(Ordering::SeqCst)
        {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.inner.save(ledger).await
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub provisioner: Arc<RecordingProvisioner>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_persistence(Arc::new(InMemoryPersistence::new())).await
    }

    pub async fn with_persistence(persistence: Arc<dyn TransactionPersistence>) -> Self {
        let store = Arc::new(TransactionStore::open(persistence).await.unwrap());
        let gateway = Arc::new(FakeGateway::default());
        let provisioner = Arc::new(RecordingProvisioner::default());
        let state = AppState::new(
            Arc::new(Catalog::default()),
            store,
            gateway.clone(),
            provisioner.clone(),
            "6311719".to_string(),
        );

        Self {
            app: create_app(state.clone()),
            state,
            gateway,
            provisioner,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Initiates a purchase and returns the local transaction id.
    pub async fn pay(&self, phone: &str, package_id: &str) -> String {
        let (status, body) = self
            .post_json("/pay", json!({ "phone": phone, "packageId": package_id }))
            .await;
        assert_eq!(status, StatusCode::OK, "pay failed: {}", body);
        body["txId"].as_str().unwrap().to_string()
    }
}

/// STK confirmation body as the provider sends it.
pub fn stk_callback(checkout_request_id: Option<&str>, result_code: i64, items: Value) -> Value {
    let mut callback = json!({
        "MerchantRequestID": "29115-34620561-1",
        "ResultCode": result_code,
        "ResultDesc": if result_code == 0 {
            "The service request is processed successfully."
        } else {
            "Request cancelled by user"
        },
    });
    if let Some(id) = checkout_request_id {
        callback["CheckoutRequestID"] = json!(id);
    }
    if !items.is_null() {
        callback["CallbackMetadata"] = json!({ "Item": items });
    }
    json!({ "Body": { "stkCallback": callback } })
}

pub fn metadata(amount: u32, phone: u64) -> Value {
    json!([
        { "Name": "Amount", "Value": amount },
        { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
        { "Name": "TransactionDate", "Value": 20191219102115u64 },
        { "Name": "PhoneNumber", "Value": phone }
    ])
}
