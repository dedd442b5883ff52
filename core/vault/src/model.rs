//! Entry and snapshot types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Account credentials stored under an entry name.
///
/// This is also the plaintext payload that gets encrypted per entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Entry {
    /// Account identifier (user name, e-mail address, ...).
    pub account: String,
    /// Password or other secret.
    pub secret: String,
}

impl Entry {
    /// Create a new entry.
    pub fn new(account: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("account", &self.account)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Read-only view of a named entry, as handed to callers.
#[derive(Clone, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct EntryView {
    pub name: String,
    pub account: String,
    pub secret: String,
}

impl EntryView {
    pub(crate) fn new(name: &str, entry: &Entry) -> Self {
        Self {
            name: name.to_string(),
            account: entry.account.clone(),
            secret: entry.secret.clone(),
        }
    }
}

impl fmt::Debug for EntryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryView")
            .field("name", &self.name)
            .field("account", &self.account)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// One row of a bulk export: an entry together with its category.
#[derive(Clone, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct ExportRow {
    pub category: String,
    pub name: String,
    pub account: String,
    pub secret: String,
}

impl fmt::Debug for ExportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRow")
            .field("category", &self.category)
            .field("name", &self.name)
            .field("account", &self.account)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Durable vault contents exchanged with the persistent store.
///
/// The store serializes a snapshot on save and parses a fresh one on load;
/// it never holds on to the engine's live state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Entry table keyed by entry name.
    pub entries: BTreeMap<String, Entry>,
    /// Real categories (including "Uncategorized") and their member names.
    pub categories: BTreeMap<String, Vec<String>>,
    /// Encoded blobs that could not be opened on load, written back as-is.
    pub retained: BTreeMap<String, String>,
}

impl Snapshot {
    /// True when there are no entries, categories or retained blobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.categories.is_empty() && self.retained.is_empty()
    }
}
