use axum::Json;
use serde_json::{json, Value};

use crate::http::error::ApiError;

pub const STATUS_MODE: &str = "Rust (packed JSON collections)";

pub async fn status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "mode": STATUS_MODE,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
