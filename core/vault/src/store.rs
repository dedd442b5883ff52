//! Persistent store for vault snapshots.
//!
//! Two artifacts are written through a [`StorageProvider`]:
//! - the entry artifact, a JSON object mapping each plaintext entry name to
//!   `base64(encrypt(key, json{account, secret}))`
//! - the category artifact, a plaintext JSON object mapping each real
//!   category to its ordered member names
//!
//! Every entry payload is encrypted on its own, so one damaged blob does
//! not prevent loading the others.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::{LoadPolicy, VaultConfig};
use crate::model::{Entry, Snapshot};
use passvault_common::{Error, Result};
use passvault_crypto::{decrypt, encrypt, VaultKey};
use passvault_storage::StorageProvider;

/// Why a single entry blob could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFailureKind {
    /// The blob is not valid base64.
    Encoding,
    /// Authentication failed: wrong key, truncation or tampering.
    Decryption,
    /// The decrypted payload is not a valid entry.
    Parse,
}

impl fmt::Display for EntryFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Encoding => "encoding",
            Self::Decryption => "decryption",
            Self::Parse => "parse",
        };
        f.write_str(label)
    }
}

/// A per-entry load failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub name: String,
    pub kind: EntryFailureKind,
    pub message: String,
}

impl EntryFailure {
    fn into_error(self) -> Error {
        let message = format!("Entry '{}': {}", self.name, self.message);
        match self.kind {
            EntryFailureKind::Decryption => Error::Decryption(message),
            EntryFailureKind::Encoding | EntryFailureKind::Parse => Error::Serialization(message),
        }
    }
}

/// Result of loading both artifacts.
#[derive(Debug, Clone, Default)]
pub struct LoadedVault {
    pub snapshot: Snapshot,
    /// Entries skipped under [`LoadPolicy::SkipCorrupt`].
    pub failures: Vec<EntryFailure>,
}

/// Serializes snapshots to, and parses them from, the vault artifacts.
pub struct VaultStore {
    provider: Arc<dyn StorageProvider>,
    key: VaultKey,
    entries_file: String,
    categories_file: String,
}

impl VaultStore {
    /// Create a store writing the artifacts named in `config`.
    pub fn new(provider: Arc<dyn StorageProvider>, key: VaultKey, config: &VaultConfig) -> Self {
        Self {
            provider,
            key,
            entries_file: config.entries_file.clone(),
            categories_file: config.categories_file.clone(),
        }
    }

    /// Get the underlying storage provider.
    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// Write both artifacts.
    ///
    /// Entries are written before categories. Each artifact is replaced
    /// atomically; blobs retained from a lenient load are written back
    /// unchanged. If the category write fails, the previous entry artifact
    /// is put back (or removed on first run) before the error is returned,
    /// so a failed save leaves both artifacts as they were.
    ///
    /// # Errors
    /// - `Error::Persistence` if an artifact cannot be written
    /// - `Error::Serialization` if a payload cannot be encoded
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut blobs: BTreeMap<&str, String> = BTreeMap::new();
        for (name, entry) in &snapshot.entries {
            blobs.insert(name, self.seal(entry)?);
        }
        for (name, blob) in &snapshot.retained {
            blobs.insert(name, blob.clone());
        }

        let entries_json =
            serde_json::to_vec_pretty(&blobs).map_err(|e| Error::Serialization(e.to_string()))?;
        let categories_json = serde_json::to_vec_pretty(&snapshot.categories)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let previous = self
            .provider
            .read(&self.entries_file)
            .map_err(|e| Error::Persistence(format!("Cannot read '{}': {}", self.entries_file, e)))?;

        self.write(&self.entries_file, &entries_json)?;
        if let Err(e) = self.write(&self.categories_file, &categories_json) {
            self.restore_entries(previous.as_deref());
            return Err(e);
        }

        debug!(
            entries = snapshot.entries.len(),
            retained = snapshot.retained.len(),
            categories = snapshot.categories.len(),
            "Vault saved"
        );
        Ok(())
    }

    /// Read both artifacts.
    ///
    /// A missing artifact yields an empty map.
    ///
    /// # Errors
    /// - `Error::Persistence` if an artifact exists but cannot be read
    /// - `Error::Serialization` if an artifact is not valid JSON
    /// - Under [`LoadPolicy::Strict`], the first unreadable entry:
    ///   `Error::Decryption` for authentication failures,
    ///   `Error::Serialization` otherwise
    pub fn load(&self, policy: LoadPolicy) -> Result<LoadedVault> {
        let blobs: BTreeMap<String, String> = self.read_json(&self.entries_file)?;
        let categories: BTreeMap<String, Vec<String>> = self.read_json(&self.categories_file)?;

        let mut loaded = LoadedVault::default();
        loaded.snapshot.categories = categories;

        for (name, blob) in blobs {
            match self.open(&blob) {
                Ok(entry) => {
                    loaded.snapshot.entries.insert(name, entry);
                }
                Err((kind, message)) => {
                    let failure = EntryFailure {
                        name: name.clone(),
                        kind,
                        message,
                    };
                    if policy == LoadPolicy::Strict {
                        return Err(failure.into_error());
                    }
                    warn!(entry = %name, kind = %kind, "Skipping unreadable entry");
                    loaded.snapshot.retained.insert(name, blob);
                    loaded.failures.push(failure);
                }
            }
        }

        debug!(
            entries = loaded.snapshot.entries.len(),
            skipped = loaded.failures.len(),
            "Vault loaded"
        );
        Ok(loaded)
    }

    fn seal(&self, entry: &Entry) -> Result<String> {
        let payload = Zeroizing::new(
            serde_json::to_vec(entry).map_err(|e| Error::Serialization(e.to_string()))?,
        );
        let ciphertext = encrypt(&self.key, &payload)?;
        Ok(STANDARD.encode(ciphertext))
    }

    fn open(&self, blob: &str) -> std::result::Result<Entry, (EntryFailureKind, String)> {
        let ciphertext = STANDARD
            .decode(blob)
            .map_err(|e| (EntryFailureKind::Encoding, e.to_string()))?;
        let plaintext = Zeroizing::new(
            decrypt(&self.key, &ciphertext)
                .map_err(|e| (EntryFailureKind::Decryption, e.to_string()))?,
        );
        serde_json::from_slice(&plaintext).map_err(|e| (EntryFailureKind::Parse, e.to_string()))
    }

    fn read_json<T>(&self, name: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let bytes = self
            .provider
            .read(name)
            .map_err(|e| Error::Persistence(format!("Cannot read '{}': {}", name, e)))?;

        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Serialization(format!("Artifact '{}': {}", name, e))),
            None => {
                debug!(artifact = name, "Artifact missing, starting empty");
                Ok(T::default())
            }
        }
    }

    /// Undo an entry artifact write after the category write failed.
    fn restore_entries(&self, previous: Option<&[u8]>) {
        let restored = match previous {
            Some(bytes) => self.provider.write_atomic(&self.entries_file, bytes),
            None => self.provider.delete(&self.entries_file),
        };
        if let Err(e) = restored {
            warn!(artifact = %self.entries_file, error = %e, "Cannot restore entry artifact");
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.provider
            .write_atomic(name, bytes)
            .map_err(|e| Error::Persistence(format!("Cannot write '{}': {}", name, e)))
    }
}
