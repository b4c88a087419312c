use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};
use validate::ValidationDiagnostic;

use crate::StoreError;

/// Durable home for rejected rows and the reason each was rejected.
///
/// A write covers the whole batch: either every diagnostic lands or none do.
pub trait RejectSink: Send + Sync {
    fn write(&self, diagnostics: &[ValidationDiagnostic]) -> Result<(), StoreError>;
}

/// Writes diagnostics as a pretty-printed JSON array.
///
/// Output goes to a sibling temp file first and is renamed into place, so a
/// reader never sees a half-written artifact. Each run replaces the previous
/// file.
#[derive(Debug, Clone)]
pub struct JsonRejectSink {
    path: PathBuf,
}

impl JsonRejectSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RejectSink for JsonRejectSink {
    fn write(&self, diagnostics: &[ValidationDiagnostic]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(diagnostics)?;
        let staging = self.staging_path();
        fs::write(&staging, body).map_err(|e| StoreError::io(&staging, e))?;

        if let Err(e) = fs::rename(&staging, &self.path) {
            warn!(path = %self.path.display(), error = %e, "reject_rename_failed");
            let _ = fs::remove_file(&staging);
            return Err(StoreError::io(&self.path, e));
        }

        info!(
            path = %self.path.display(),
            rejected = diagnostics.len(),
            "rejects_written"
        );
        Ok(())
    }
}

/// Reads back an artifact written by [`JsonRejectSink`].
pub fn read_rejects(path: impl AsRef<Path>) -> Result<Vec<ValidationDiagnostic>, StoreError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Keeps diagnostics in memory, one entry per `write` call.
#[derive(Debug, Default)]
pub struct MemoryRejectSink {
    batches: Mutex<Vec<Vec<ValidationDiagnostic>>>,
}

impl MemoryRejectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics written so far, flattened in write order.
    pub fn diagnostics(&self) -> Vec<ValidationDiagnostic> {
        let guard = self
            .batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.iter().flatten().cloned().collect()
    }

    pub fn write_count(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl RejectSink for MemoryRejectSink {
    fn write(&self, diagnostics: &[ValidationDiagnostic]) -> Result<(), StoreError> {
        self.batches
            .lock()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .push(diagnostics.to_vec());
        Ok(())
    }
}
