use anyhow::Context;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::store::{decode, Collection, CollectionStore};

pub const LEGACY_BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    /// Collections whose file was produced from the legacy document.
    pub migrated: Vec<Collection>,
    /// Collections left alone because their file already existed.
    pub skipped: Vec<Collection>,
    /// Sections of the legacy document that could not be decoded. Their
    /// files are not created and the legacy document stays in place.
    pub failed: Vec<Collection>,
    pub archived_to: Option<PathBuf>,
}

/// Prepares the data directory: splits a legacy single-document database
/// into per-collection files when one is present, then makes sure every
/// collection has a file.
///
/// A legacy document that cannot be parsed is left untouched and reported
/// as a warning; startup continues with whatever files exist. Collections
/// whose legacy section is malformed get no file on this startup, so the
/// next one retries them.
pub fn init_data_dir(store: &CollectionStore, legacy_path: &Path) -> anyhow::Result<MigrationSummary> {
    let mut summary = MigrationSummary::default();

    if legacy_path.is_file() {
        match migrate_legacy_document(store, legacy_path) {
            Ok(s) => summary = s,
            Err(e) => warn!(path = %legacy_path.display(), error = %format!("{e:#}"), "legacy migration failed"),
        }
    }

    for collection in Collection::ALL {
        if !store.exists(collection) && !summary.failed.contains(&collection) {
            store
                .write(collection, &[])
                .with_context(|| format!("failed to initialise {collection}"))?;
        }
    }

    Ok(summary)
}

/// Splits `{ "students": [...], "attendance": [...], ... }` into one file per
/// collection, never overwriting an existing file, then renames the legacy
/// document with [`LEGACY_BACKUP_SUFFIX`].
///
/// Each section is migrated on its own. A malformed section is logged and
/// listed in [`MigrationSummary::failed`]; the others still migrate, and the
/// legacy document is only archived when no section failed.
pub fn migrate_legacy_document(
    store: &CollectionStore,
    legacy_path: &Path,
) -> anyhow::Result<MigrationSummary> {
    info!(path = %legacy_path.display(), "migrating legacy database");
    let text = std::fs::read_to_string(legacy_path)
        .with_context(|| format!("failed to read {}", legacy_path.to_string_lossy()))?;
    let doc: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is invalid JSON", legacy_path.to_string_lossy()))?;
    let Value::Object(mut doc) = doc else {
        anyhow::bail!("legacy database must be a JSON object");
    };

    let mut summary = MigrationSummary::default();
    for collection in Collection::ALL {
        if store.exists(collection) {
            info!(collection = %collection, "collection file exists, keeping it");
            summary.skipped.push(collection);
            continue;
        }
        let section = doc
            .remove(collection.name())
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let records = match decode(collection, section) {
            Ok(records) => records,
            Err(e) => {
                warn!(collection = %collection, error = %e, "legacy section is malformed, leaving it unmigrated");
                summary.failed.push(collection);
                continue;
            }
        };
        store.write(collection, &records)?;
        info!(collection = %collection, records = records.len(), "collection migrated");
        summary.migrated.push(collection);
    }

    if !summary.failed.is_empty() {
        warn!(
            path = %legacy_path.display(),
            failed = summary.failed.len(),
            "legacy database kept until every section migrates"
        );
        return Ok(summary);
    }

    let archived = archive_path(legacy_path);
    std::fs::rename(legacy_path, &archived).with_context(|| {
        format!(
            "failed to archive legacy database to {}",
            archived.to_string_lossy()
        )
    })?;
    info!(archived = %archived.display(), "legacy database archived");
    summary.archived_to = Some(archived);
    Ok(summary)
}

fn archive_path(legacy_path: &Path) -> PathBuf {
    let mut name = legacy_path.as_os_str().to_owned();
    name.push(LEGACY_BACKUP_SUFFIX);
    PathBuf::from(name)
}
