use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde_json::Value;

use crate::http::error::{success, ApiError};
use crate::http::types::{blocking, body_record, non_empty, AppState, AttendanceQuery};
use crate::models::Record;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let activity_id = non_empty(&query.activity_id).map(str::to_string);
    let records = blocking(move || state.ledger.list_for_session(activity_id.as_deref())).await?;
    Ok(Json(records))
}

/// A repeat scan of the same (activity, student) pair is accepted and
/// ignored.
pub async fn append(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    state.ledger.append(body_record(&body)).await?;
    Ok(success())
}
