use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

pub async fn list_packages(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "till": state.till_number,
        "packages": state.catalog.packages(),
    }))
}
