use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::services::PurchaseInput;
use crate::validation::ValidationError;
use crate::AppState;

pub async fn pay(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!("Rejected purchase body: {}", rejection.body_text());
        ValidationError::new("body", "must be a JSON object with phone and packageId")
    })?;

    let output = state
        .payments
        .initiate(PurchaseInput {
            phone: text_field(&payload, "phone"),
            package_id: text_field(&payload, "packageId"),
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "txId": output.transaction_id,
        "mpesa": output.provider_response,
    })))
}

/// Reads a string field, accepting numbers as their decimal text.
fn text_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_field_accepts_strings_and_numbers() {
        let payload = json!({ "phone": 712345678, "packageId": "p_sh19", "flag": true });
        assert_eq!(text_field(&payload, "phone").as_deref(), Some("712345678"));
        assert_eq!(text_field(&payload, "packageId").as_deref(), Some("p_sh19"));
        assert_eq!(text_field(&payload, "flag"), None);
        assert_eq!(text_field(&payload, "missing"), None);
        assert_eq!(text_field(&json!(["phone"]), "phone"), None);
    }
}
