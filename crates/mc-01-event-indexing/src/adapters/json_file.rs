//! JSON-file persistence for the audit document and the cursor checkpoint.
//!
//! Both files are rewritten whole: serialize, write to a sibling temp file,
//! `sync_all`, then rename over the target. A crash at any point leaves
//! either the old or the new file, never a torn one.

use crate::domain::{AuditDocument, StoreError};
use crate::ports::outbound::{CheckpointStore, DocumentBackend};
use serde::{Deserialize, Serialize};
use shared_types::BlockNumber;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Audit document stored as pretty-printed JSON.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<AuditDocument>, StoreError> {
        let Some(bytes) = read_if_present(&self.path)? else {
            tracing::info!("[mc-01] No audit document at {}", self.path.display());
            return Ok(None);
        };

        let document: AuditDocument =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupted {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(
            "[mc-01] Loaded audit document from {} ({} bytes)",
            self.path.display(),
            bytes.len()
        );
        Ok(Some(document))
    }

    fn persist(&mut self, document: &AuditDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(StoreError::serialization)?;
        write_atomically(&self.path, &bytes)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Checkpoint {
    last_processed_block: BlockNumber,
}

/// `{ "lastProcessedBlock": n }`
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> Result<Option<BlockNumber>, StoreError> {
        let Some(bytes) = read_if_present(&self.path)? else {
            return Ok(None);
        };
        let checkpoint: Checkpoint =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupted {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(checkpoint.last_processed_block))
    }

    fn save(&mut self, last_processed: BlockNumber) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&Checkpoint {
            last_processed_block: last_processed,
        })
        .map_err(StoreError::serialization)?;
        write_atomically(&self.path, &bytes)
    }
}

/// `None` for a missing or blank file.
fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(None),
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(e)),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StoreError::io)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = std::fs::File::create(&temp_path).map_err(StoreError::io)?;
    file.write_all(bytes).map_err(StoreError::io)?;
    file.sync_all().map_err(StoreError::io)?;

    std::fs::rename(&temp_path, path).map_err(StoreError::io)
}
