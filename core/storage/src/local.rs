//! Local filesystem storage provider.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::provider::StorageProvider;
use passvault_common::{Error, Result};

/// Local filesystem storage provider.
///
/// Stores each blob as a file directly under the root directory. Writes go
/// to a temporary file in the same directory, are synced, and then renamed
/// over the target, so a crash never leaves a half-written artifact.
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied or other I/O failure while creating the root
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            fs::create_dir_all(&root)?;
        }

        Ok(Self { root })
    }

    /// Convert a blob name to a filesystem path.
    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(Error::Validation("Blob name cannot be empty".to_string()));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(Error::Validation(format!(
                "Blob name cannot contain path separators: {}",
                name
            )));
        }
        Ok(self.root.join(name))
    }
}

impl StorageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(name)?;

        match fs::read(&path) {
            Ok(data) => {
                debug!(blob = name, size = data.len(), "Read blob");
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(name)?;

        // Temp files are created owner-only, so the persisted blob keeps
        // those permissions.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| {
            Error::Persistence(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;

        debug!(blob = name, size = bytes.len(), "Wrote blob");
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.blob_path(name)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
