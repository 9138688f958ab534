use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Endpoint not found")]
    NotFound,

    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Attendance ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } | ApiError::Ledger { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body returned by every write endpoint, whether or not anything changed.
pub fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}
