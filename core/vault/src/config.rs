//! Vault configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use passvault_common::{Error, Result};

/// Key artifact name in the vault directory.
pub const KEY_FILENAME: &str = "secret.key";

/// Entry artifact name in the vault directory.
pub const ENTRIES_FILENAME: &str = "entries.dat";

/// Category artifact name in the vault directory.
pub const CATEGORIES_FILENAME: &str = "categories.dat";

/// Optional configuration file name in the vault directory.
pub const CONFIG_FILENAME: &str = "passvault.json";

/// Configuration format version for migration support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultVersion {
    pub major: u32,
    pub minor: u32,
}

impl VaultVersion {
    /// Current configuration format version.
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with the current version.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for VaultVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// What to do when a single entry blob cannot be opened during load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Abort the load on the first unreadable entry.
    #[default]
    Strict,
    /// Skip unreadable entries, report them, and keep their blobs intact.
    SkipCorrupt,
}

/// Vault configuration.
///
/// Names the three artifacts inside the vault directory and the load
/// policy. Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Configuration format version.
    pub version: VaultVersion,
    /// Name of the raw key artifact.
    pub key_file: String,
    /// Name of the encrypted entry artifact.
    pub entries_file: String,
    /// Name of the plaintext category artifact.
    pub categories_file: String,
    /// Handling of unreadable entry blobs on load.
    pub load_policy: LoadPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            version: VaultVersion::CURRENT,
            key_file: KEY_FILENAME.to_string(),
            entries_file: ENTRIES_FILENAME.to_string(),
            categories_file: CATEGORIES_FILENAME.to_string(),
            load_policy: LoadPolicy::Strict,
        }
    }
}

impl VaultConfig {
    /// Set the load policy.
    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Check that the configuration can be used to open a vault.
    ///
    /// # Errors
    /// - Incompatible version
    /// - Empty artifact name
    /// - Two artifacts sharing a name
    pub fn validate(&self) -> Result<()> {
        if !self.version.is_compatible() {
            return Err(Error::Validation(format!(
                "Incompatible config version: {}.{}",
                self.version.major, self.version.minor
            )));
        }

        let names = [&self.key_file, &self.entries_file, &self.categories_file];
        if names.iter().any(|n| n.is_empty()) {
            return Err(Error::Validation(
                "Artifact names cannot be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(Error::Validation(
                "Artifact names must be distinct".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}
