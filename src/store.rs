use anyhow::Context;
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Record;

/// Format marker written at the top of every packed collection file.
pub const PACKED_FORMAT: &str = "kzattend.packed.v1";

const STUDENT_FIELDS: &[&str] = &["id", "lastName", "firstName", "dob", "classId"];
const ATTENDANCE_FIELDS: &[&str] = &["id", "activityId", "studentId", "timestamp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Classes,
    Students,
    Subjects,
    Activities,
    Attendance,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Classes,
        Collection::Students,
        Collection::Subjects,
        Collection::Activities,
        Collection::Attendance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Classes => "classes",
            Collection::Students => "students",
            Collection::Subjects => "subjects",
            Collection::Activities => "activities",
            Collection::Attendance => "attendance",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Field order used for the positional encoding, if this collection
    /// declares one.
    pub fn schema(self) -> Option<&'static [&'static str]> {
        match self {
            Collection::Students => Some(STUDENT_FIELDS),
            Collection::Attendance => Some(ATTENDANCE_FIELDS),
            _ => None,
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("unsupported format marker: {0:?}")]
    UnknownFormat(String),
    #[error("packed envelope is missing {0}")]
    MissingField(&'static str),
    #[error("positional row found in {0}, which declares no schema")]
    RowsWithoutSchema(Collection),
    #[error("element {index} is neither a record nor a row")]
    BadElement { index: usize },
}

/// Turns one record into its positional row. Fields outside the schema are
/// dropped; absent fields become null.
pub fn pack_row(fields: &[&str], record: &Record) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|f| record.get(*f).cloned().unwrap_or(Value::Null))
            .collect(),
    )
}

/// Inverse of [`pack_row`]. Short rows leave trailing fields absent; extra
/// cells are ignored.
pub fn unpack_row<S: AsRef<str>>(fields: &[S], row: &[Value]) -> Record {
    fields
        .iter()
        .zip(row.iter())
        .map(|(f, v)| (f.as_ref().to_string(), v.clone()))
        .collect()
}

/// Produces the on-disk document for a collection.
pub fn encode(collection: Collection, records: &[Record]) -> Value {
    match collection.schema() {
        Some(fields) => json!({
            "format": PACKED_FORMAT,
            "fields": fields,
            "rows": records.iter().map(|r| pack_row(fields, r)).collect::<Vec<_>>(),
        }),
        None => Value::Array(records.iter().cloned().map(Value::Object).collect()),
    }
}

/// Reads any of the three accepted layouts: the tagged packed envelope, a
/// bare array of positional rows, or a bare array of records. Bare arrays
/// are decoded element by element so files mixing both shapes still load.
pub fn decode(collection: Collection, doc: Value) -> Result<Vec<Record>, DecodeError> {
    match doc {
        Value::Object(mut envelope) => {
            let format = envelope
                .get("format")
                .and_then(Value::as_str)
                .ok_or(DecodeError::MissingField("format"))?;
            if format != PACKED_FORMAT {
                return Err(DecodeError::UnknownFormat(format.to_string()));
            }
            let fields: Vec<String> = envelope
                .get("fields")
                .and_then(Value::as_array)
                .ok_or(DecodeError::MissingField("fields"))?
                .iter()
                .map(|f| f.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(DecodeError::MissingField("fields"))?;
            let Some(Value::Array(rows)) = envelope.remove("rows") else {
                return Err(DecodeError::MissingField("rows"));
            };
            rows.into_iter()
                .enumerate()
                .map(|(index, row)| match row {
                    Value::Array(cells) => Ok(unpack_row(fields.as_slice(), &cells)),
                    _ => Err(DecodeError::BadElement { index }),
                })
                .collect()
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                Value::Array(cells) => {
                    let fields = collection
                        .schema()
                        .ok_or(DecodeError::RowsWithoutSchema(collection))?;
                    Ok(unpack_row(fields, &cells))
                }
                _ => Err(DecodeError::BadElement { index }),
            })
            .collect(),
        _ => Err(DecodeError::Json("top-level value must be an array or envelope".into())),
    }
}

/// One JSON file per collection under a data directory.
pub struct CollectionStore {
    data_dir: PathBuf,
    locks: [Mutex<()>; 6],
}

impl CollectionStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.to_string_lossy())
        })?;
        Ok(Self {
            data_dir,
            locks: Default::default(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    pub fn exists(&self, collection: Collection) -> bool {
        self.path_for(collection).is_file()
    }

    /// Serialises read-modify-write cycles on one collection. Plain reads do
    /// not need it since writes replace the file by rename.
    pub fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        self.locks[collection.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Never fails: a missing file is an empty collection, and so is a file
    /// that cannot be decoded (logged).
    pub fn read(&self, collection: Collection) -> Vec<Record> {
        let path = self.path_for(collection);
        let raw = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(collection = %collection, error = %e, "failed to read collection file");
                return Vec::new();
            }
        };
        let decoded = serde_json::from_slice::<Value>(&raw)
            .map_err(|e| DecodeError::Json(e.to_string()))
            .and_then(|doc| decode(collection, doc));
        match decoded {
            Ok(records) => records,
            Err(e) => {
                warn!(collection = %collection, path = %path.display(), error = %e, "malformed collection file, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replaces the whole collection. Content goes to a sibling temp file
    /// first and is renamed over the target.
    pub fn write(&self, collection: Collection, records: &[Record]) -> anyhow::Result<()> {
        let path = self.path_for(collection);
        let tmp = self
            .data_dir
            .join(format!(".{}.{}.tmp", collection.file_name(), Uuid::new_v4()));
        let bytes = serde_json::to_vec(&encode(collection, records))
            .with_context(|| format!("failed to encode {collection}"))?;
        std::fs::write(&tmp, bytes)
            .with_context(|| format!("failed to write temp file {}", tmp.to_string_lossy()))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| {
                format!("failed to move collection into place at {}", path.to_string_lossy())
            });
        }
        debug!(collection = %collection, records = records.len(), "collection written");
        Ok(())
    }
}
