use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::http::error::{success, ApiError};
use crate::http::types::{blocking, body_record, AppState};
use crate::models::{natural_key, Record};
use crate::store::Collection;

/// Collections served by the generic handlers. Students and attendance
/// have dedicated routes and are not reachable here.
fn crud_collection(name: &str) -> Result<Collection, ApiError> {
    match Collection::parse(name) {
        Some(
            c @ (Collection::Classes
            | Collection::Subjects
            | Collection::Activities
            | Collection::Users),
        ) => Ok(c),
        _ => Err(ApiError::NotFound),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let collection = crud_collection(&name)?;
    let records = blocking(move || state.records.list(collection)).await?;
    Ok(Json(records))
}

pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let collection = crud_collection(&name)?;
    let record = body_record(&body);
    blocking(move || state.records.create(collection, record)).await??;
    Ok(success())
}

pub async fn replace(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let collection = crud_collection(&name)?;
    let record = body_record(&body);
    blocking(move || state.records.replace_by_key(collection, record)).await??;
    Ok(success())
}

pub async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let collection = crud_collection(&name)?;
    if let Some(key) = natural_key(&body_record(&body)) {
        let records = state.records.clone();
        let target = key.clone();
        let removed = blocking(move || records.delete_by_key(collection, &target)).await??;
        if removed > 0 {
            info!(collection = %collection, key = %key, removed, "records deleted");
        }
    }
    Ok(success())
}
