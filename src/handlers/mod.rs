pub mod admin;
pub mod mpesa;
pub mod packages;
pub mod payments;

use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub transactions: usize,
    pub mpesa_circuit: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        transactions: state.store.len().await,
        mpesa_circuit: state.gateway.circuit_state(),
    })
}
