use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::utils::sanitize::sanitize_json;
use crate::AppState;

const MAX_LOGGED_PAYLOAD: usize = 1000;

/// Confirmation callback from the STK push.
///
/// The provider retries anything that is not acknowledged, so every payload
/// that can be processed is accepted, matched or not. Only a storage failure
/// returns an error acknowledgment.
pub async fn confirmation(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => payload,
        Err(_) => {
            tracing::warn!(body_size = body.len(), "Non-JSON M-PESA callback, acknowledging");
            return accepted();
        }
    };

    let logged = sanitize_json(&payload).to_string();
    tracing::info!(
        "Received mpesa confirmation: {}",
        truncate(&logged, MAX_LOGGED_PAYLOAD)
    );

    match state.reconciler.reconcile(&payload).await {
        Ok(outcome) => {
            tracing::debug!(outcome = ?outcome, "Confirmation processed");
            accepted()
        }
        Err(e) => {
            tracing::error!("Error handling mpesa confirmation: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ResultCode": 1, "ResultDesc": "Error" })),
            )
        }
    }
}

fn accepted() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "ResultCode": 0, "ResultDesc": "Accepted" })),
    )
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
