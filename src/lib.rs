pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod mpesa;
pub mod ports;
pub mod services;
pub mod store;
pub mod utils;
pub mod validation;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::adapters::JsonFilePersistence;
use crate::config::Config;
use crate::domain::Catalog;
use crate::mpesa::MpesaClient;
use crate::ports::{PaymentGateway, Provisioner, TransactionPersistence};
use crate::services::{CallbackReconciler, HttpProvisioner, PaymentService, SimulatedProvisioner};
use crate::store::TransactionStore;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<TransactionStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub payments: PaymentService,
    pub reconciler: CallbackReconciler,
    pub till_number: String,
}

impl AppState {
    /// Wires the services around an already opened store.
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<TransactionStore>,
        gateway: Arc<dyn PaymentGateway>,
        provisioner: Arc<dyn Provisioner>,
        till_number: String,
    ) -> Self {
        let payments = PaymentService::new(catalog.clone(), store.clone(), gateway.clone());
        let reconciler = CallbackReconciler::new(catalog.clone(), store.clone(), provisioner);
        Self {
            catalog,
            store,
            gateway,
            payments,
            reconciler,
            till_number,
        }
    }

    /// Production wiring: JSON file ledger, M-PESA client, configured provisioner.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let persistence: Arc<dyn TransactionPersistence> =
            Arc::new(JsonFilePersistence::new(config.data_file.clone()));
        let store = Arc::new(TransactionStore::open(persistence).await?);

        let gateway: Arc<dyn PaymentGateway> = Arc::new(MpesaClient::new(config.mpesa.clone()));
        let provisioner: Arc<dyn Provisioner> = match &config.provisioning_url {
            Some(url) => Arc::new(HttpProvisioner::new(
                url.clone(),
                config.provisioning_timeout_secs,
            )),
            None => Arc::new(SimulatedProvisioner),
        };

        Ok(Self::new(
            Arc::new(Catalog::default()),
            store,
            gateway,
            provisioner,
            config.till_number.clone(),
        ))
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/packages", get(handlers::packages::list_packages))
        .route("/pay", post(handlers::payments::pay))
        .route("/mpesa/confirmation", post(handlers::mpesa::confirmation))
        .route("/admin/transactions", get(handlers::admin::list_transactions))
        .route(
            "/admin/transactions/:phone",
            get(handlers::admin::get_phone_transactions),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}
