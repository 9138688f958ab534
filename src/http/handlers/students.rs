use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde_json::Value;

use crate::http::error::{success, ApiError};
use crate::http::types::{blocking, body_value, non_empty, AppState, StudentsQuery};
use crate::models::Record;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<StudentsQuery>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let class_id = non_empty(&query.class_id).map(str::to_string);
    let students = blocking(move || state.records.list_students(class_id.as_deref())).await?;
    Ok(Json(students))
}

/// Accepts one student or an array of them.
pub async fn import(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let incoming: Vec<Record> = match body_value(&body) {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        Value::Object(record) => vec![record],
        _ => Vec::new(),
    };
    blocking(move || state.records.import_students(incoming)).await??;
    Ok(success())
}
