//! Knowledge-base manifest: per-file processing status.
//!
//! The manifest is a JSON array of knowledge-base objects, each with a
//! `files` array of file records. The pipeline only ever reads a record by
//! id and sets its `status`, so access goes through the narrow
//! [`ManifestStore`] interface; a locked or transactional store can replace
//! [`JsonManifest`] without touching the pipeline.
//!
//! [`JsonManifest`] reads the whole file, edits it in memory and rewrites it
//! in full. Keys keep their original order, non-ASCII text is written
//! literally, and every field other than the matched record's `status` is
//! left as it was. There is no locking: with two concurrent writers the
//! later one wins.

use crate::error::ScanError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Status written once a transcript has been produced.
pub const STATUS_SYNCED: &str = "synced";

/// Typed view of one file record. Unknown fields are ignored here but
/// preserved in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Key-value access to file records by id.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// The first record with this id, if any.
    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, ScanError>;

    /// Set `status` on every record with this id; returns how many matched.
    async fn set_status(&self, file_id: &str, status: &str) -> Result<usize, ScanError>;
}

/// File-backed manifest (`knowledge_bases.json`).
#[derive(Debug, Clone)]
pub struct JsonManifest {
    path: PathBuf,
}

impl JsonManifest {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole manifest.
    pub async fn load(&self) -> Result<Vec<Value>, ScanError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ScanError::ManifestReadFailed {
                path: self.path.clone(),
                source: e,
            })?;
        serde_json::from_str(&raw).map_err(|e| ScanError::ManifestParseFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Rewrite the whole manifest.
    ///
    /// A regular file is replaced atomically (temp file + rename) and keeps
    /// its permissions. A symlinked manifest is written in place through the
    /// link so the link itself survives.
    async fn store(&self, knowledge_bases: &[Value]) -> Result<(), ScanError> {
        let write_err = |e: std::io::Error| ScanError::ManifestWriteFailed {
            path: self.path.clone(),
            source: e,
        };
        let body = serde_json::to_string_pretty(knowledge_bases)
            .map_err(|e| ScanError::Internal(format!("manifest serialisation: {e}")))?;

        let link_meta = tokio::fs::symlink_metadata(&self.path).await.ok();
        if link_meta.as_ref().is_some_and(|m| m.file_type().is_symlink()) {
            debug!("Manifest {} is a symlink; writing in place", self.path.display());
            return tokio::fs::write(&self.path, body).await.map_err(write_err);
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body).await.map_err(write_err)?;
        if let Some(meta) = link_meta {
            tokio::fs::set_permissions(&tmp_path, meta.permissions())
                .await
                .map_err(write_err)?;
        }
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_err)
    }
}

#[async_trait]
impl ManifestStore for JsonManifest {
    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, ScanError> {
        let mut kbs = self.load().await?;
        let found = file_entries_mut(&mut kbs)
            .find(|entry| has_id(entry, file_id))
            .map(|entry| Value::Object(entry.clone()));

        found
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ScanError::ManifestParseFailed {
                path: self.path.clone(),
                source: e,
            })
    }

    async fn set_status(&self, file_id: &str, status: &str) -> Result<usize, ScanError> {
        let mut kbs = self.load().await?;

        let mut matched = 0;
        for entry in file_entries_mut(&mut kbs).filter(|e| has_id(e, file_id)) {
            entry.insert("status".to_string(), Value::String(status.to_string()));
            let name = entry.get("name").and_then(Value::as_str).unwrap_or(file_id);
            info!("File '{}' status set to {}", name, status);
            matched += 1;
        }

        if matched == 0 {
            debug!("No manifest record for '{}'; manifest left unchanged", file_id);
            return Ok(0);
        }

        self.store(&kbs).await?;
        Ok(matched)
    }
}

/// Every file-record object across all knowledge bases.
fn file_entries_mut<'a>(
    kbs: &'a mut [Value],
) -> impl Iterator<Item = &'a mut Map<String, Value>> + 'a {
    kbs.iter_mut()
        .filter_map(|kb| kb.get_mut("files").and_then(Value::as_array_mut))
        .flat_map(|files| files.iter_mut())
        .filter_map(Value::as_object_mut)
}

fn has_id(entry: &Map<String, Value>, file_id: &str) -> bool {
    entry.get("id").and_then(Value::as_str) == Some(file_id)
}
