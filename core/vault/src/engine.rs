//! Vault engine: the authoritative in-memory state plus every mutation.
//!
//! Mutations are staged on a copy of the state and flushed through the
//! persistent store; the copy replaces the live state only once the flush
//! succeeded. A failed flush therefore leaves both the on-disk artifacts
//! and the in-memory state as they were.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::VaultConfig;
use crate::keyfile::load_or_create_key;
use crate::model::{Entry, EntryView, ExportRow};
use crate::search::Matches;
use crate::state::VaultState;
use crate::store::{EntryFailure, VaultStore};
use passvault_common::{CategoryKey, Result};
use passvault_storage::StorageProvider;

/// An open vault.
pub struct Vault {
    store: VaultStore,
    state: VaultState,
    load_failures: Vec<EntryFailure>,
}

impl Vault {
    /// Open the vault stored in `provider`.
    ///
    /// # Preconditions
    /// - `config` must validate
    ///
    /// # Postconditions
    /// - A key exists in storage (generated on first run)
    /// - "Uncategorized" exists and every loaded entry has one category
    ///
    /// # Errors
    /// - `Error::Validation` for an invalid configuration
    /// - `Error::KeyIo` if the key cannot be loaded or created
    /// - `Error::Persistence` / `Error::Serialization` for unreadable artifacts
    /// - `Error::Decryption` under the strict load policy
    pub fn open(config: VaultConfig, provider: Arc<dyn StorageProvider>) -> Result<Self> {
        config.validate()?;

        let key = load_or_create_key(provider.as_ref(), &config.key_file)?;
        let store = VaultStore::new(provider, key, &config);
        let loaded = store.load(config.load_policy)?;

        let (state, report) = VaultState::from_snapshot(loaded.snapshot);
        for category in &report.ignored_categories {
            warn!(category = %category, "Ignoring stored list for derived category");
        }
        for (category, name) in &report.dangling {
            warn!(category = %category, entry = %name, "Dropping reference to missing entry");
        }
        for (category, name) in &report.duplicates {
            warn!(category = %category, entry = %name, "Dropping duplicate membership");
        }
        for name in &report.rehomed {
            warn!(entry = %name, "Moving uncategorized entry to Uncategorized");
        }

        info!(
            provider = store.provider().name(),
            entries = state.len(),
            skipped = loaded.failures.len(),
            "Vault opened"
        );

        Ok(Self {
            store,
            state,
            load_failures: loaded.failures,
        })
    }

    /// Apply `mutate` to a staged copy, flush it, and commit on success.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut VaultState) -> Result<T>) -> Result<T> {
        let mut staged = self.state.clone();
        let output = mutate(&mut staged)?;
        self.store.save(staged.snapshot())?;
        self.state = staged;
        Ok(output)
    }

    /// Add an entry.
    ///
    /// An existing name is resolved to the first free `name_N`. An empty
    /// or "All" category places the entry in "Uncategorized"; an unknown
    /// category is created.
    ///
    /// # Returns
    /// The name the entry was actually stored under.
    pub fn add_entry(
        &mut self,
        name: &str,
        account: &str,
        secret: &str,
        category: impl Into<CategoryKey>,
    ) -> Result<String> {
        let category = category.into();
        let entry = Entry::new(account, secret);
        let resolved = self.commit(|state| state.add_entry(name, entry, category))?;

        info!(entry = %resolved, requested = name, "Entry added");
        Ok(resolved)
    }

    /// Replace an entry's credentials, optionally renaming it and moving it
    /// to another category.
    ///
    /// # Errors
    /// - `Error::NotFound` if `old_name` does not exist
    /// - `Error::Validation` for empty fields or if `new_name` belongs to
    ///   another entry
    pub fn rename_or_update_entry(
        &mut self,
        old_name: &str,
        new_name: &str,
        account: &str,
        secret: &str,
        category: impl Into<CategoryKey>,
    ) -> Result<()> {
        let category = category.into();
        let entry = Entry::new(account, secret);
        self.commit(|state| state.update_entry(old_name, new_name, entry, category))?;

        info!(entry = %new_name, previous = old_name, "Entry updated");
        Ok(())
    }

    /// Alias of [`rename_or_update_entry`](Self::rename_or_update_entry).
    pub fn update_entry(
        &mut self,
        old_name: &str,
        new_name: &str,
        account: &str,
        secret: &str,
        category: impl Into<CategoryKey>,
    ) -> Result<()> {
        self.rename_or_update_entry(old_name, new_name, account, secret, category)
    }

    /// Delete an entry from the table and from every category.
    pub fn delete_entry(&mut self, name: &str) -> Result<()> {
        self.commit(|state| state.delete_entry(name))?;
        info!(entry = %name, "Entry deleted");
        Ok(())
    }

    /// Create an empty category.
    pub fn add_category(&mut self, name: &str) -> Result<()> {
        self.commit(|state| state.add_category(name))?;
        info!(category = %name, "Category added");
        Ok(())
    }

    /// Rename a user category.
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<()> {
        self.commit(|state| state.rename_category(old, new))?;
        info!(category = %new, previous = old, "Category renamed");
        Ok(())
    }

    /// Delete a user category, moving its members to "Uncategorized".
    ///
    /// # Returns
    /// The number of entries moved.
    pub fn delete_category(&mut self, name: &str) -> Result<usize> {
        let moved = self.commit(|state| state.delete_category(name))?;
        info!(category = %name, moved, "Category deleted");
        Ok(moved)
    }

    /// The category holding `name`, defaulting to "Uncategorized".
    pub fn reverse_lookup(&self, name: &str) -> CategoryKey {
        self.state.reverse_lookup(name)
    }

    /// Case-insensitive search over entry names and accounts.
    pub fn query(&self, text: &str) -> Result<Matches<'_>> {
        self.state.query(text)
    }

    /// Readable entries in a category, in member order.
    pub fn entries_in(&self, category: impl Into<CategoryKey>) -> Result<Vec<EntryView>> {
        self.state.entries_in(&category.into())
    }

    /// All categories, "All" and "Uncategorized" first.
    pub fn category_names(&self) -> Vec<CategoryKey> {
        self.state.category_keys()
    }

    /// Look up one entry.
    pub fn entry(&self, name: &str) -> Option<EntryView> {
        self.state.entry(name).map(|entry| EntryView::new(name, entry))
    }

    pub fn all_entries(&self) -> &[String] {
        self.state.all_entries()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Entries that could not be opened when the vault was loaded.
    pub fn load_failures(&self) -> &[EntryFailure] {
        &self.load_failures
    }

    /// Rows for a bulk export, one per real category membership.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.state.export_rows()
    }
}
