use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error};

use crate::models::{field_matches, key_text, Record};
use crate::store::{Collection, CollectionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    /// The (activity, student) pair was already present; nothing written.
    Duplicate,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("attendance ledger task has stopped")]
    Closed,
    #[error(transparent)]
    Write(#[from] anyhow::Error),
}

/// Operations sent to the ledger task.
enum LedgerOp {
    Append {
        record: Record,
        tx: oneshot::Sender<Result<AppendOutcome, LedgerError>>,
    },
}

/// The attendance collection plus its at-most-once rule per
/// (activity, student).
///
/// Appends are funnelled through one background task, so the duplicate
/// check and the write it guards never interleave with another append. The
/// task waits for each file write on the blocking pool before taking the
/// next one.
/// Cloning shares the same task. When the last handle drops the channel
/// closes and the task exits after draining what it already received.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<CollectionStore>,
    in_tx: mpsc::UnboundedSender<LedgerOp>,
    #[allow(dead_code)]
    join_handle: Arc<JoinHandle<()>>,
}

impl Ledger {
    /// Must be called from within a Tokio runtime.
    pub fn spawn(store: Arc<CollectionStore>) -> Self {
        let (in_tx, mut in_rx) = mpsc::unbounded_channel::<LedgerOp>();
        let task_store = store.clone();

        let join_handle = tokio::spawn(async move {
            while let Some(op) = in_rx.recv().await {
                match op {
                    LedgerOp::Append { record, tx } => {
                        let store = task_store.clone();
                        let result = tokio::task::spawn_blocking(move || append_now(&store, record))
                            .await
                            .map_err(|e| LedgerError::Write(anyhow::Error::new(e)))
                            .and_then(|r| r.map_err(LedgerError::from));
                        if let Err(e) = &result {
                            error!(error = %e, "attendance append failed");
                        }
                        let _ = tx.send(result);
                    }
                }
            }
        });

        Self {
            store,
            in_tx,
            join_handle: Arc::new(join_handle),
        }
    }

    /// Entries for one activity in insertion order, or the whole ledger when
    /// no activity is given.
    pub fn list_for_session(&self, activity_id: Option<&str>) -> Vec<Record> {
        let list = self.store.read(Collection::Attendance);
        match activity_id {
            Some(activity_id) => list
                .into_iter()
                .filter(|r| field_matches(r, "activityId", activity_id))
                .collect(),
            None => list,
        }
    }

    pub async fn append(&self, record: Record) -> Result<AppendOutcome, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.in_tx
            .send(LedgerOp::Append { record, tx })
            .map_err(|_| LedgerError::Closed)?;
        rx.await.map_err(|_| LedgerError::Closed)?
    }
}

fn pair_of(record: &Record) -> (Option<String>, Option<String>) {
    (
        record.get("activityId").and_then(key_text),
        record.get("studentId").and_then(key_text),
    )
}

/// Check-and-append against the current file contents, under the
/// attendance collection lock.
pub fn append_now(store: &CollectionStore, record: Record) -> anyhow::Result<AppendOutcome> {
    let _guard = store.lock(Collection::Attendance);
    let mut list = store.read(Collection::Attendance);
    let incoming = pair_of(&record);
    if list.iter().any(|existing| pair_of(existing) == incoming) {
        debug!(
            activity_id = incoming.0.as_deref().unwrap_or(""),
            student_id = incoming.1.as_deref().unwrap_or(""),
            "duplicate attendance suppressed"
        );
        return Ok(AppendOutcome::Duplicate);
    }
    list.push(record);
    store.write(Collection::Attendance, &list)?;
    Ok(AppendOutcome::Inserted)
}
