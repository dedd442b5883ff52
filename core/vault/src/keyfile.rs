//! Key artifact handling.

use tracing::{debug, info};
use zeroize::Zeroizing;

use passvault_common::{Error, Result};
use passvault_crypto::{VaultKey, KEY_LENGTH};
use passvault_storage::StorageProvider;

/// Load the vault key, generating and persisting a fresh one on first run.
///
/// # Postconditions
/// - When this returns a freshly generated key, that key is already durable
///
/// # Errors
/// - `Error::KeyIo` if the artifact exists but cannot be read
/// - `Error::KeyIo` if the artifact does not hold exactly one key
/// - `Error::KeyIo` if a newly generated key cannot be written
pub fn load_or_create_key(provider: &dyn StorageProvider, name: &str) -> Result<VaultKey> {
    let existing = provider
        .read(name)
        .map_err(|e| Error::KeyIo(format!("Cannot read key '{}': {}", name, e)))?;

    match existing {
        Some(bytes) => {
            let bytes = Zeroizing::new(bytes);
            if bytes.len() != KEY_LENGTH {
                return Err(Error::KeyIo(format!(
                    "Key '{}' has {} bytes, expected {}",
                    name,
                    bytes.len(),
                    KEY_LENGTH
                )));
            }
            debug!(key = name, "Key loaded");
            VaultKey::from_slice(&bytes).map_err(|e| Error::KeyIo(e.to_string()))
        }
        None => {
            let key = VaultKey::generate();
            provider
                .write_atomic(name, key.as_bytes())
                .map_err(|e| Error::KeyIo(format!("Cannot write key '{}': {}", name, e)))?;
            info!(key = name, provider = provider.name(), "Generated new vault key");
            Ok(key)
        }
    }
}
