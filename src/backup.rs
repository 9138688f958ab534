use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::store::{decode, encode, Collection, CollectionStore};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT_V1: &str = "kzattend-data-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub record_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub collections_restored: Vec<Collection>,
}

fn entry_name(collection: Collection) -> String {
    format!("collections/{}", collection.file_name())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Writes every collection, in its stored encoding, into a zip bundle with
/// a checksummed manifest.
pub fn export_bundle(store: &CollectionStore, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::new();
    let mut record_count = 0;
    for collection in Collection::ALL {
        let records = store.read(collection);
        record_count += records.len();
        let bytes = serde_json::to_vec(&encode(collection, &records))
            .with_context(|| format!("failed to serialize {collection}"))?;
        let name = entry_name(collection);
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {name}"))?;
        zip.write_all(&bytes)
            .with_context(|| format!("failed to write entry {name}"))?;
        entries.push(json!({
            "collection": collection.name(),
            "path": name,
            "records": records.len(),
            "sha256": sha256_hex(&bytes),
        }));
    }

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "entries": entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: Collection::ALL.len() + 1,
        record_count,
    })
}

/// Restores collections from a bundle. Every entry is verified against the
/// manifest before anything is written, so a damaged bundle leaves the data
/// directory as it was.
pub fn import_bundle(in_path: &Path, store: &CollectionStore) -> anyhow::Result<ImportSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let entries = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .context("manifest has no entries")?;

    let mut staged = Vec::new();
    for entry in entries {
        let name = entry.get("collection").and_then(|v| v.as_str()).unwrap_or("");
        let collection = Collection::parse(name)
            .ok_or_else(|| anyhow!("bundle names unknown collection: {}", name))?;
        let path = entry_name(collection);
        let mut bytes = Vec::new();
        archive
            .by_name(&path)
            .with_context(|| format!("bundle missing {path}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {path}"))?;
        let expected = entry.get("sha256").and_then(|v| v.as_str()).unwrap_or("");
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(anyhow!(
                "checksum mismatch for {}: expected={} actual={}",
                path,
                expected,
                actual
            ));
        }
        let doc: Value =
            serde_json::from_slice(&bytes).with_context(|| format!("{path} is invalid JSON"))?;
        let records = decode(collection, doc).with_context(|| format!("{path} is malformed"))?;
        staged.push((collection, records));
    }

    let mut restored = Vec::new();
    for (collection, records) in staged {
        let _guard = store.lock(collection);
        store.write(collection, &records)?;
        restored.push(collection);
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        collections_restored: restored,
    })
}
