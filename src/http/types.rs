use std::sync::Arc;

use axum::body::Bytes;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http::error::ApiError;
use crate::ledger::Ledger;
use crate::models::Record;
use crate::records::RecordService;
use crate::store::CollectionStore;

#[derive(Clone)]
pub struct AppState {
    pub records: RecordService,
    pub ledger: Ledger,
}

impl AppState {
    /// Spawns the ledger task, so this needs a Tokio runtime.
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self {
            records: RecordService::new(store.clone()),
            ledger: Ledger::spawn(store),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StudentsQuery {
    #[serde(rename = "classId")]
    pub class_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    #[serde(rename = "activityId")]
    pub activity_id: Option<String>,
}

/// Runs store work on the blocking pool so file I/O and collection locks
/// stay off the async workers.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Storage(anyhow::Error::new(e).context("store task failed")))
}

/// Empty query values mean "no filter".
pub fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

/// Request bodies never fail a request: missing or malformed JSON reads as
/// an empty object.
pub fn body_value(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Object(Record::new());
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, "malformed request body treated as empty object");
        Value::Object(Record::new())
    })
}

pub fn body_record(body: &Bytes) -> Record {
    match body_value(body) {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}
