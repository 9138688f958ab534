use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{field_matches, key_text, natural_key, Record};
use crate::store::{Collection, CollectionStore};

/// Uniform CRUD over collections keyed by `id` (or `username`).
///
/// Every mutation rewrites the whole collection while holding that
/// collection's lock, so two concurrent writers cannot drop each other's
/// update.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<CollectionStore>,
}

impl RecordService {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CollectionStore> {
        &self.store
    }

    pub fn list(&self, collection: Collection) -> Vec<Record> {
        self.store.read(collection)
    }

    /// Appends without checking for an existing key.
    pub fn create(&self, collection: Collection, record: Record) -> anyhow::Result<()> {
        let _guard = self.store.lock(collection);
        let mut list = self.store.read(collection);
        list.push(record);
        self.store.write(collection, &list)
    }

    /// Shallow-merges `incoming` over the stored record with the same natural
    /// key. Returns whether a record matched; a miss writes nothing.
    pub fn replace_by_key(&self, collection: Collection, incoming: Record) -> anyhow::Result<bool> {
        let Some(key) = natural_key(&incoming) else {
            return Ok(false);
        };
        let _guard = self.store.lock(collection);
        let mut list = self.store.read(collection);
        let Some(existing) = list
            .iter_mut()
            .find(|r| natural_key(r).as_deref() == Some(key.as_str()))
        else {
            debug!(collection = %collection, key = %key, "replace matched nothing");
            return Ok(false);
        };
        for (field, value) in incoming {
            existing.insert(field, value);
        }
        self.store.write(collection, &list)?;
        Ok(true)
    }

    /// Removes every record whose natural key equals `key`. Returns the
    /// number removed; the file is only rewritten when that is non-zero.
    pub fn delete_by_key(&self, collection: Collection, key: &str) -> anyhow::Result<usize> {
        let _guard = self.store.lock(collection);
        let list = self.store.read(collection);
        let before = list.len();
        let kept: Vec<Record> = list
            .into_iter()
            .filter(|r| natural_key(r).as_deref() != Some(key))
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.store.write(collection, &kept)?;
        }
        Ok(removed)
    }

    pub fn list_students(&self, class_id: Option<&str>) -> Vec<Record> {
        let list = self.store.read(Collection::Students);
        match class_id {
            Some(class_id) => list
                .into_iter()
                .filter(|s| field_matches(s, "classId", class_id))
                .collect(),
            None => list,
        }
    }

    /// Adds students whose `id` is not already enrolled, including ids
    /// repeated inside the same batch. Returns how many were added.
    pub fn import_students(&self, incoming: Vec<Record>) -> anyhow::Result<usize> {
        let _guard = self.store.lock(Collection::Students);
        let mut list = self.store.read(Collection::Students);
        let mut known: HashSet<String> = list
            .iter()
            .filter_map(|s| s.get("id").and_then(key_text))
            .collect();
        let mut added = 0;
        for student in incoming {
            let Some(id) = student.get("id").and_then(key_text) else {
                warn!("skipping student without id");
                continue;
            };
            if known.insert(id) {
                list.push(student);
                added += 1;
            }
        }
        if added > 0 {
            self.store.write(Collection::Students, &list)?;
            info!(added, total = list.len(), "students imported");
        }
        Ok(added)
    }
}
