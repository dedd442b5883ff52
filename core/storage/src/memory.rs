//! In-memory storage provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use crate::provider::StorageProvider;
use passvault_common::{Error, Result};

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Reads and writes can be made to fail on demand to
/// exercise error paths in the layers above.
#[derive(Default)]
pub struct MemoryProvider {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_writes_to: Mutex<Option<String>>,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with an I/O error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes to one blob fail while others succeed.
    ///
    /// Pass `None` to clear.
    pub fn set_fail_writes_to(&self, name: Option<&str>) {
        let mut target = self
            .fail_writes_to
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *target = name.map(str::to_string);
    }

    fn write_should_fail(&self, name: &str) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_writes_to
            .lock()
            .map(|target| target.as_deref() == Some(name))
            .unwrap_or(false)
    }

    /// Names of all stored blobs, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| Error::Persistence("Memory store lock poisoned".to_string()))?;
        let mut names: Vec<String> = blobs.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("Simulated read failure: {}", name),
            )));
        }

        let blobs = self
            .blobs
            .read()
            .map_err(|_| Error::Persistence("Memory store lock poisoned".to_string()))?;
        Ok(blobs.get(name).cloned())
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        if self.write_should_fail(name) {
            return Err(Error::Io(std::io::Error::other(format!(
                "Simulated write failure: {}",
                name
            ))));
        }

        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| Error::Persistence("Memory store lock poisoned".to_string()))?;
        blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| Error::Persistence("Memory store lock poisoned".to_string()))?;
        blobs.remove(name);
        Ok(())
    }
}
