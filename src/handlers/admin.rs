use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::domain::phone;
use crate::error::AppError;
use crate::AppState;

/// Full ledger dump, keyed by phone.
pub async fn list_transactions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot().await)
}

pub async fn get_phone_transactions(
    State(state): State<AppState>,
    Path(raw_phone): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let phone = phone::normalize_str(&raw_phone);
    let history = state.store.history(&phone).await;
    if history.is_empty() {
        return Err(AppError::NotFound(format!("No transactions for {}", phone)));
    }

    Ok(Json(history))
}
