//! Storage provider trait definition.

use passvault_common::Result;

/// Storage provider trait for vault artifacts.
///
/// Artifacts are small named blobs (the key, the entry table, the category
/// map). Every write replaces the whole blob atomically: a reader sees
/// either the complete old content or the complete new content, never a
/// partial write.
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "local", "memory").
    fn name(&self) -> &str;

    /// Read a blob by name.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` if the blob exists
    /// - `Ok(None)` if the blob does not exist
    ///
    /// # Errors
    /// - I/O failure other than absence (e.g., permission denied)
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically write a blob, replacing any existing content.
    ///
    /// # Postconditions
    /// - On success the blob holds exactly `bytes`
    /// - On failure the previous content (or absence) is left in place
    ///
    /// # Errors
    /// - I/O failure (e.g., permission denied, disk full)
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Delete a blob.
    ///
    /// Returns `Ok(())` even if the blob doesn't exist.
    fn delete(&self, name: &str) -> Result<()>;

    /// Check if a blob exists.
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.read(name)?.is_some())
    }
}
