use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::mpesa::MpesaError;
use crate::ports::StoreError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("phone and packageId are required")]
    MissingFields(#[from] ValidationError),

    #[error("Package not found")]
    PackageNotFound(String),

    #[error("Only one purchase allowed per number per day for this package")]
    AlreadyPurchasedToday,

    #[error("Failed to initiate payment")]
    InitiationFailed(#[source] MpesaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_) => StatusCode::BAD_REQUEST,
            AppError::PackageNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyPurchasedToday => StatusCode::FORBIDDEN,
            AppError::InitiationFailed(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable rejection code returned to purchase clients.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::MissingFields(_) => "missing_fields",
            AppError::PackageNotFound(_) => "package_not_found",
            AppError::AlreadyPurchasedToday => "already_purchased_today",
            AppError::InitiationFailed(_) => "initiation_failed",
            AppError::NotFound(_) => "not_found",
            AppError::Storage(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "reason": self.reason(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
