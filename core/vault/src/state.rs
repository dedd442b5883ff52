//! In-memory vault state.
//!
//! `VaultState` owns the entry table and the category map and implements
//! every mutation as a pure in-memory step. After each step:
//!
//! 1. every entry name is listed in exactly one real category;
//! 2. the derived "All" list equals the entry table's key set;
//! 3. entry names and category names are unique;
//! 4. "Uncategorized" exists and neither reserved category can be renamed
//!    or deleted.
//!
//! Persistence is layered on top by the engine, which stages a copy of the
//! state, mutates it here, and commits it only after a successful flush.

use std::collections::{BTreeMap, HashSet};

use passvault_common::{CategoryKey, Error, Result, UNCATEGORIZED};

use crate::model::{Entry, EntryView, ExportRow, Snapshot};
use crate::search::Matches;

/// Derive the "All" category from the entry table.
///
/// Always recomputed from scratch, never patched incrementally.
pub fn derive_all_entries(entries: &BTreeMap<String, Entry>) -> Vec<String> {
    entries.keys().cloned().collect()
}

/// Resolve a requested entry name against the names already taken.
///
/// Returns the name itself when free, otherwise the first free
/// `{name}_{n}` for n = 1, 2, ...
pub fn resolve_unique_name(requested: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(requested) {
        return requested.to_string();
    }

    let mut index: u64 = 1;
    loop {
        let candidate = format!("{}_{}", requested, index);
        if !is_taken(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

/// Repairs applied while turning a loaded snapshot into a valid state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Category keys naming the derived category; their lists were dropped.
    pub ignored_categories: Vec<String>,
    /// `(category, name)` references to entries that do not exist.
    pub dangling: Vec<(String, String)>,
    /// `(category, name)` memberships beyond the first one for a name.
    pub duplicates: Vec<(String, String)>,
    /// Entries that were listed nowhere and got moved to "Uncategorized".
    pub rehomed: Vec<String>,
}

impl RepairReport {
    /// True when the snapshot already satisfied every invariant.
    pub fn is_clean(&self) -> bool {
        self.ignored_categories.is_empty()
            && self.dangling.is_empty()
            && self.duplicates.is_empty()
            && self.rehomed.is_empty()
    }
}

/// Entry table, category map and the derived "All" list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultState {
    data: Snapshot,
    all_entries: Vec<String>,
}

impl Default for VaultState {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultState {
    /// Create an empty state seeded with the default categories.
    pub fn new() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(UNCATEGORIZED.to_string(), Vec::new());

        Self {
            data: Snapshot {
                categories,
                ..Snapshot::default()
            },
            all_entries: Vec::new(),
        }
    }

    /// Build a state from a loaded snapshot, repairing any drift so that
    /// every invariant holds.
    ///
    /// When a name is listed in several categories, the first category in
    /// name order keeps it.
    pub fn from_snapshot(snapshot: Snapshot) -> (Self, RepairReport) {
        let Snapshot {
            entries,
            categories: raw,
            retained,
        } = snapshot;

        let mut report = RepairReport::default();
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (category, members) in raw {
            if !CategoryKey::parse(&category).is_real() {
                report.ignored_categories.push(category);
                continue;
            }

            let mut kept = Vec::with_capacity(members.len());
            for name in members {
                if !entries.contains_key(&name) && !retained.contains_key(&name) {
                    report.dangling.push((category.clone(), name));
                } else if !seen.insert(name.clone()) {
                    report.duplicates.push((category.clone(), name));
                } else {
                    kept.push(name);
                }
            }
            categories.insert(category, kept);
        }

        let uncategorized = categories.entry(UNCATEGORIZED.to_string()).or_default();
        for name in entries.keys() {
            if !seen.contains(name) {
                uncategorized.push(name.clone());
                report.rehomed.push(name.clone());
            }
        }

        let mut state = Self {
            data: Snapshot {
                entries,
                categories,
                retained,
            },
            all_entries: Vec::new(),
        };
        state.refresh();

        (state, report)
    }

    /// Durable contents, as handed to the persistent store.
    pub fn snapshot(&self) -> &Snapshot {
        &self.data
    }

    /// Names in the derived "All" category.
    pub fn all_entries(&self) -> &[String] {
        &self.all_entries
    }

    /// Look up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.data.entries.get(name)
    }

    /// Number of readable entries.
    pub fn len(&self) -> usize {
        self.data.entries.len()
    }

    /// True when the entry table is empty.
    pub fn is_empty(&self) -> bool {
        self.data.entries.is_empty()
    }

    /// Names of entries whose blobs could not be opened on load.
    pub fn retained_names(&self) -> impl Iterator<Item = &str> {
        self.data.retained.keys().map(String::as_str)
    }

    /// Member names of a category, or `None` if it does not exist.
    pub fn members(&self, category: &CategoryKey) -> Option<&[String]> {
        match category {
            CategoryKey::AllEntries => Some(self.all_entries.as_slice()),
            other => self.data.categories.get(other.name()).map(Vec::as_slice),
        }
    }

    /// Readable entries listed in a category, in member order.
    ///
    /// # Errors
    /// - `Error::NotFound` if the category does not exist
    pub fn entries_in(&self, category: &CategoryKey) -> Result<Vec<EntryView>> {
        let members = self
            .members(category)
            .ok_or_else(|| Error::NotFound(format!("Category '{}'", category)))?;

        Ok(members
            .iter()
            .filter_map(|name| self.entry(name).map(|entry| EntryView::new(name, entry)))
            .collect())
    }

    /// All categories: "All", "Uncategorized", then user categories by name.
    pub fn category_keys(&self) -> Vec<CategoryKey> {
        let mut keys = vec![CategoryKey::AllEntries, CategoryKey::Uncategorized];
        keys.extend(
            self.data
                .categories
                .keys()
                .map(|name| CategoryKey::parse(name))
                .filter(|key| !key.is_reserved()),
        );
        keys
    }

    /// The first real category listing `name`, or "Uncategorized" when no
    /// category lists it.
    pub fn reverse_lookup(&self, name: &str) -> CategoryKey {
        self.data
            .categories
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == name))
            .map(|(category, _)| CategoryKey::parse(category))
            .unwrap_or(CategoryKey::Uncategorized)
    }

    /// Case-insensitive substring search over entry names and accounts.
    ///
    /// # Errors
    /// - `Error::Validation` if `text` is empty
    pub fn query(&self, text: &str) -> Result<Matches<'_>> {
        if text.is_empty() {
            return Err(Error::Validation("Search text cannot be empty".to_string()));
        }
        Ok(Matches::new(text, self.data.entries.iter()))
    }

    /// One row per real category membership of a readable entry.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let mut rows = Vec::with_capacity(self.data.entries.len());
        for (category, members) in &self.data.categories {
            for name in members {
                if let Some(entry) = self.entry(name) {
                    rows.push(ExportRow {
                        category: category.clone(),
                        name: name.clone(),
                        account: entry.account.clone(),
                        secret: entry.secret.clone(),
                    });
                }
            }
        }
        rows
    }

    /// Add an entry, resolving name collisions with a numeric suffix.
    ///
    /// An empty or "All" category places the entry in "Uncategorized";
    /// an unknown category is created.
    ///
    /// # Returns
    /// The name the entry was stored under.
    ///
    /// # Errors
    /// - `Error::Validation` if the name, account or secret is empty
    pub fn add_entry(&mut self, name: &str, entry: Entry, category: CategoryKey) -> Result<String> {
        if name.is_empty() {
            return Err(Error::Validation("Entry name cannot be empty".to_string()));
        }
        validate_credentials(&entry)?;

        let resolved = resolve_unique_name(name, |candidate| self.is_name_taken(candidate));
        self.data.entries.insert(resolved.clone(), entry);
        self.place(&resolved, category);
        self.refresh();

        Ok(resolved)
    }

    /// Replace an entry's credentials and optionally rename it or move it
    /// to another category.
    ///
    /// The entry leaves every category that listed it and is appended to
    /// the target category exactly as in [`add_entry`](Self::add_entry).
    ///
    /// # Errors
    /// - `Error::NotFound` if `old_name` does not exist
    /// - `Error::Validation` if the new name, account or secret is empty
    /// - `Error::Validation` if `new_name` belongs to another entry
    pub fn update_entry(
        &mut self,
        old_name: &str,
        new_name: &str,
        entry: Entry,
        category: CategoryKey,
    ) -> Result<()> {
        if !self.data.entries.contains_key(old_name) {
            return Err(Error::NotFound(format!("Entry '{}'", old_name)));
        }
        if new_name.is_empty() {
            return Err(Error::Validation("Entry name cannot be empty".to_string()));
        }
        validate_credentials(&entry)?;
        if new_name != old_name && self.is_name_taken(new_name) {
            return Err(Error::Validation(format!(
                "Entry '{}' already exists",
                new_name
            )));
        }

        self.scrub(old_name);
        self.data.entries.remove(old_name);
        self.data.entries.insert(new_name.to_string(), entry);
        self.place(new_name, category);
        self.refresh();

        Ok(())
    }

    /// Delete an entry and every membership that lists it.
    ///
    /// Entries that failed to load can be deleted too, which drops their
    /// retained blob.
    ///
    /// # Errors
    /// - `Error::NotFound` if no entry has this name
    pub fn delete_entry(&mut self, name: &str) -> Result<()> {
        let removed_entry = self.data.entries.remove(name).is_some();
        let removed_blob = self.data.retained.remove(name).is_some();
        if !removed_entry && !removed_blob {
            return Err(Error::NotFound(format!("Entry '{}'", name)));
        }

        self.scrub(name);
        self.refresh();
        Ok(())
    }

    /// Create an empty user category.
    ///
    /// # Errors
    /// - `Error::Validation` if the name is empty, reserved or taken
    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = user_category_name(name)?;
        if self.data.categories.contains_key(&name) {
            return Err(Error::Validation(format!(
                "Category '{}' already exists",
                name
            )));
        }

        self.data.categories.insert(name, Vec::new());
        Ok(())
    }

    /// Rename a user category, keeping its member list.
    ///
    /// # Errors
    /// - `Error::Validation` if either name is empty or reserved
    /// - `Error::NotFound` if `old` does not exist
    /// - `Error::Validation` if `new` already exists
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<()> {
        let old = user_category_name(old)?;
        let new = user_category_name(new)?;

        if !self.data.categories.contains_key(&old) {
            return Err(Error::NotFound(format!("Category '{}'", old)));
        }
        if self.data.categories.contains_key(&new) {
            return Err(Error::Validation(format!(
                "Category '{}' already exists",
                new
            )));
        }

        let members = self.data.categories.remove(&old).unwrap_or_default();
        self.data.categories.insert(new, members);
        Ok(())
    }

    /// Delete a user category, moving its members to "Uncategorized".
    ///
    /// Members already listed in "Uncategorized" are not added twice.
    ///
    /// # Returns
    /// The number of names appended to "Uncategorized".
    ///
    /// # Errors
    /// - `Error::Validation` if the name is empty, reserved or absent
    pub fn delete_category(&mut self, name: &str) -> Result<usize> {
        let name = user_category_name(name)?;
        let members = self
            .data
            .categories
            .remove(&name)
            .ok_or_else(|| Error::Validation(format!("Category '{}' does not exist", name)))?;

        let uncategorized = self
            .data
            .categories
            .entry(UNCATEGORIZED.to_string())
            .or_default();

        let mut moved = 0;
        for member in members {
            if !uncategorized.contains(&member) {
                uncategorized.push(member);
                moved += 1;
            }
        }

        Ok(moved)
    }

    /// Recompute the derived "All" category.
    pub fn refresh(&mut self) {
        self.all_entries = derive_all_entries(&self.data.entries);
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.data.entries.contains_key(name) || self.data.retained.contains_key(name)
    }

    /// Append `name` to the target category, creating it when needed.
    fn place(&mut self, name: &str, category: CategoryKey) {
        let target = match category.canonical() {
            CategoryKey::AllEntries => UNCATEGORIZED.to_string(),
            other => other.name().to_string(),
        };

        let members = self.data.categories.entry(target).or_default();
        if !members.iter().any(|m| m == name) {
            members.push(name.to_string());
        }
    }

    /// Remove every occurrence of `name` from every member list.
    fn scrub(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for members in self.data.categories.values_mut() {
            let before = members.len();
            members.retain(|m| m != name);
            removed += before - members.len();
        }
        removed
    }
}

fn validate_credentials(entry: &Entry) -> Result<()> {
    if entry.account.is_empty() {
        return Err(Error::Validation("Account cannot be empty".to_string()));
    }
    if entry.secret.is_empty() {
        return Err(Error::Validation("Secret cannot be empty".to_string()));
    }
    Ok(())
}

/// Validate a caller-supplied name for a user category.
fn user_category_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::Validation("Category name cannot be empty".to_string()));
    }
    match CategoryKey::parse(name) {
        CategoryKey::Named(name) => Ok(name),
        reserved => Err(Error::Validation(format!(
            "'{}' is a reserved category",
            reserved
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passvault_common::ALL_ENTRIES;
    use proptest::prelude::*;

    fn named(name: &str) -> CategoryKey {
        CategoryKey::Named(name.to_string())
    }

    fn add(state: &mut VaultState, name: &str, category: CategoryKey) -> String {
        state
            .add_entry(name, Entry::new("acct", "pw"), category)
            .unwrap()
    }

    /// Check every state invariant, panicking with context on violation.
    fn assert_invariants(state: &VaultState) {
        let snapshot = state.snapshot();

        let keys: Vec<String> = snapshot.entries.keys().cloned().collect();
        assert_eq!(state.all_entries(), keys.as_slice(), "All must equal entry keys");

        for name in snapshot.entries.keys() {
            let count: usize = snapshot
                .categories
                .values()
                .map(|members| members.iter().filter(|m| *m == name).count())
                .sum();
            assert_eq!(count, 1, "entry '{}' listed {} times", name, count);
        }

        for (category, members) in &snapshot.categories {
            assert!(CategoryKey::parse(category).is_real());
            for member in members {
                assert!(
                    snapshot.entries.contains_key(member) || snapshot.retained.contains_key(member),
                    "'{}' lists missing entry '{}'",
                    category,
                    member
                );
            }
        }

        assert!(snapshot.categories.contains_key(UNCATEGORIZED));
    }

    #[test]
    fn test_new_state_is_seeded() {
        let state = VaultState::new();

        assert!(state.is_empty());
        assert_eq!(
            state.category_keys(),
            vec![CategoryKey::AllEntries, CategoryKey::Uncategorized]
        );
        assert_invariants(&state);
    }

    #[test]
    fn test_resolve_unique_name_first_free_suffix() {
        let taken = ["x", "x_1", "x_3"];
        let resolved = resolve_unique_name("x", |n| taken.contains(&n));
        assert_eq!(resolved, "x_2");

        assert_eq!(resolve_unique_name("y", |n| taken.contains(&n)), "y");
    }

    #[test]
    fn test_add_entry_collision_suffixes() {
        let mut state = VaultState::new();

        assert_eq!(add(&mut state, "x", CategoryKey::AllEntries), "x");
        assert_eq!(add(&mut state, "x", CategoryKey::AllEntries), "x_1");
        assert_eq!(add(&mut state, "x", CategoryKey::AllEntries), "x_2");

        assert_eq!(state.all_entries(), &["x", "x_1", "x_2"]);
        assert_invariants(&state);
    }

    #[test]
    fn test_add_entry_placement() {
        let mut state = VaultState::new();

        add(&mut state, "a", CategoryKey::AllEntries);
        add(&mut state, "b", CategoryKey::parse(""));
        add(&mut state, "c", named("work"));
        add(&mut state, "d", CategoryKey::Uncategorized);

        assert_eq!(state.reverse_lookup("a"), CategoryKey::Uncategorized);
        assert_eq!(state.reverse_lookup("b"), CategoryKey::Uncategorized);
        assert_eq!(state.reverse_lookup("c"), named("work"));
        assert_eq!(state.members(&named("work")).unwrap(), &["c"]);
        assert_eq!(
            state.members(&CategoryKey::Uncategorized).unwrap(),
            &["a", "b", "d"]
        );
        assert_invariants(&state);
    }

    #[test]
    fn test_add_entry_named_reserved_is_canonicalized() {
        let mut state = VaultState::new();
        add(&mut state, "a", named(ALL_ENTRIES));

        assert_eq!(state.reverse_lookup("a"), CategoryKey::Uncategorized);
        assert_eq!(state.category_keys().len(), 2);
    }

    #[test]
    fn test_add_entry_rejects_empty_fields() {
        let mut state = VaultState::new();

        let cases = [("", "a", "p"), ("n", "", "p"), ("n", "a", "")];
        for (name, account, secret) in cases {
            let err = state
                .add_entry(name, Entry::new(account, secret), CategoryKey::AllEntries)
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(state.is_empty());
    }

    #[test]
    fn test_update_entry_moves_category() {
        let mut state = VaultState::new();
        add(&mut state, "github", named("dev"));

        state
            .update_entry("github", "github", Entry::new("new", "pw2"), named("work"))
            .unwrap();

        assert_eq!(state.reverse_lookup("github"), named("work"));
        assert!(state.members(&named("dev")).unwrap().is_empty());
        assert_eq!(state.entry("github").unwrap().account, "new");
        assert_invariants(&state);
    }

    #[test]
    fn test_update_entry_renames() {
        let mut state = VaultState::new();
        add(&mut state, "old", named("dev"));

        state
            .update_entry("old", "new", Entry::new("a", "p"), named("dev"))
            .unwrap();

        assert!(state.entry("old").is_none());
        assert!(state.entry("new").is_some());
        assert_eq!(state.members(&named("dev")).unwrap(), &["new"]);
        assert_invariants(&state);
    }

    #[test]
    fn test_update_entry_rejects_collision() {
        let mut state = VaultState::new();
        add(&mut state, "a", named("dev"));
        add(&mut state, "b", named("dev"));
        let before = state.clone();

        let err = state
            .update_entry("a", "b", Entry::new("x", "y"), named("dev"))
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_update_entry_missing_is_not_found() {
        let mut state = VaultState::new();
        let err = state
            .update_entry("ghost", "ghost", Entry::new("a", "p"), CategoryKey::AllEntries)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_entry_scrubs_every_list() {
        let snapshot = Snapshot {
            entries: [("dup".to_string(), Entry::new("a", "p"))].into_iter().collect(),
            categories: [
                ("one".to_string(), vec!["dup".to_string()]),
                ("two".to_string(), vec!["dup".to_string(), "dup".to_string()]),
            ]
            .into_iter()
            .collect(),
            retained: BTreeMap::new(),
        };
        // Bypass repair to simulate legacy duplicate memberships.
        let mut state = VaultState {
            data: snapshot,
            all_entries: vec!["dup".to_string()],
        };

        state.delete_entry("dup").unwrap();

        assert!(state.snapshot().categories.values().all(|m| m.is_empty()));
        assert!(state.all_entries().is_empty());
    }

    #[test]
    fn test_delete_missing_entry_is_not_found() {
        let mut state = VaultState::new();
        assert!(matches!(state.delete_entry("ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_category_rules() {
        let mut state = VaultState::new();

        state.add_category("work").unwrap();
        assert!(state.members(&named("work")).unwrap().is_empty());

        for bad in ["", "work", ALL_ENTRIES, UNCATEGORIZED] {
            assert!(
                matches!(state.add_category(bad), Err(Error::Validation(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_rename_category_keeps_members() {
        let mut state = VaultState::new();
        add(&mut state, "a", named("work"));

        state.rename_category("work", "job").unwrap();

        assert!(state.members(&named("work")).is_none());
        assert_eq!(state.members(&named("job")).unwrap(), &["a"]);
        assert_eq!(state.reverse_lookup("a"), named("job"));
        assert_invariants(&state);
    }

    #[test]
    fn test_rename_category_rules() {
        let mut state = VaultState::new();
        state.add_category("work").unwrap();
        state.add_category("home").unwrap();

        let rejected = [
            (ALL_ENTRIES, "x"),
            (UNCATEGORIZED, "x"),
            ("work", ""),
            ("work", "home"),
            ("work", UNCATEGORIZED),
            ("work", ALL_ENTRIES),
        ];
        for (old, new) in rejected {
            assert!(
                matches!(state.rename_category(old, new), Err(Error::Validation(_))),
                "{} -> {} should be rejected",
                old,
                new
            );
        }

        assert!(matches!(
            state.rename_category("ghost", "x"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_category_merges_into_uncategorized() {
        let mut state = VaultState::new();
        add(&mut state, "u", CategoryKey::Uncategorized);
        add(&mut state, "a", named("work"));
        add(&mut state, "b", named("work"));

        let moved = state.delete_category("work").unwrap();

        assert_eq!(moved, 2);
        assert!(state.members(&named("work")).is_none());
        assert_eq!(
            state.members(&CategoryKey::Uncategorized).unwrap(),
            &["u", "a", "b"]
        );
        assert_eq!(state.len(), 3);
        assert_invariants(&state);
    }

    #[test]
    fn test_delete_category_does_not_duplicate_members() {
        let mut state = VaultState {
            data: Snapshot {
                entries: [("a".to_string(), Entry::new("x", "y"))].into_iter().collect(),
                categories: [
                    (UNCATEGORIZED.to_string(), vec!["a".to_string()]),
                    ("work".to_string(), vec!["a".to_string()]),
                ]
                .into_iter()
                .collect(),
                retained: BTreeMap::new(),
            },
            all_entries: vec!["a".to_string()],
        };

        assert_eq!(state.delete_category("work").unwrap(), 0);
        assert_eq!(state.members(&CategoryKey::Uncategorized).unwrap(), &["a"]);
    }

    #[test]
    fn test_delete_category_rules() {
        let mut state = VaultState::new();

        for bad in [ALL_ENTRIES, UNCATEGORIZED, "", "ghost"] {
            assert!(
                matches!(state.delete_category(bad), Err(Error::Validation(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_reverse_lookup_defaults_to_uncategorized() {
        let state = VaultState::new();
        assert_eq!(state.reverse_lookup("nobody"), CategoryKey::Uncategorized);
    }

    #[test]
    fn test_query_rejects_empty_text() {
        let state = VaultState::new();
        assert!(matches!(state.query(""), Err(Error::Validation(_))));
    }

    #[test]
    fn test_query_matches_name_and_account() {
        let mut state = VaultState::new();
        state
            .add_entry("github", Entry::new("me@x.com", "p1"), CategoryKey::AllEntries)
            .unwrap();
        state
            .add_entry("gmail", Entry::new("github_acct", "p2"), CategoryKey::AllEntries)
            .unwrap();
        state
            .add_entry("bank", Entry::new("1234", "p3"), CategoryKey::AllEntries)
            .unwrap();

        let mut found: Vec<String> = state.query("git").unwrap().map(|v| v.name.clone()).collect();
        found.sort();
        assert_eq!(found, vec!["github", "gmail"]);
    }

    #[test]
    fn test_entries_in_category() {
        let mut state = VaultState::new();
        add(&mut state, "b", named("work"));
        add(&mut state, "a", named("work"));

        let names: Vec<String> = state
            .entries_in(&named("work"))
            .unwrap()
            .iter()
            .map(|v| v.name.clone())
            .collect();
        assert_eq!(names, vec!["b", "a"]);

        assert_eq!(state.entries_in(&CategoryKey::AllEntries).unwrap().len(), 2);
        assert!(matches!(
            state.entries_in(&named("ghost")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_export_rows_exclude_derived_category() {
        let mut state = VaultState::new();
        add(&mut state, "a", named("work"));
        add(&mut state, "b", CategoryKey::AllEntries);

        let rows = state.export_rows();
        let pairs: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.category.clone(), r.name.clone()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                (UNCATEGORIZED.to_string(), "b".to_string()),
                ("work".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_snapshot_repairs_drift() {
        let snapshot = Snapshot {
            entries: [
                ("a".to_string(), Entry::new("x", "y")),
                ("b".to_string(), Entry::new("x", "y")),
                ("c".to_string(), Entry::new("x", "y")),
            ]
            .into_iter()
            .collect(),
            categories: [
                (ALL_ENTRIES.to_string(), vec!["a".to_string(), "b".to_string()]),
                ("home".to_string(), vec!["a".to_string(), "ghost".to_string()]),
                ("work".to_string(), vec!["a".to_string(), "b".to_string()]),
            ]
            .into_iter()
            .collect(),
            retained: BTreeMap::new(),
        };

        let (state, report) = VaultState::from_snapshot(snapshot);

        assert!(!report.is_clean());
        assert_eq!(report.ignored_categories, vec![ALL_ENTRIES]);
        assert_eq!(report.dangling, vec![("home".to_string(), "ghost".to_string())]);
        assert_eq!(report.duplicates, vec![("work".to_string(), "a".to_string())]);
        assert_eq!(report.rehomed, vec!["c"]);

        assert_eq!(state.reverse_lookup("a"), named("home"));
        assert_eq!(state.reverse_lookup("b"), named("work"));
        assert_eq!(state.members(&CategoryKey::Uncategorized).unwrap(), &["c"]);
        assert_invariants(&state);
    }

    #[test]
    fn test_from_snapshot_keeps_retained_members() {
        let snapshot = Snapshot {
            entries: BTreeMap::new(),
            categories: [("work".to_string(), vec!["broken".to_string()])]
                .into_iter()
                .collect(),
            retained: [("broken".to_string(), "AAAA".to_string())]
                .into_iter()
                .collect(),
        };

        let (mut state, report) = VaultState::from_snapshot(snapshot);
        assert!(report.is_clean());
        assert_eq!(state.members(&named("work")).unwrap(), &["broken"]);

        // Retained names stay reserved for unique-name resolution.
        assert_eq!(add(&mut state, "broken", named("work")), "broken_1");
        assert_eq!(state.entries_in(&named("work")).unwrap().len(), 1);

        state.delete_entry("broken").unwrap();
        assert_eq!(state.retained_names().count(), 0);
        assert_eq!(state.members(&named("work")).unwrap(), &["broken_1"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String, String),
        Update(usize, String, String),
        Delete(usize),
        AddCategory(String),
        RenameCategory(String, String),
        DeleteCategory(String),
    }

    fn entry_name() -> impl Strategy<Value = String> {
        "[ab]{1,2}"
    }

    fn category_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just(ALL_ENTRIES.to_string()),
            Just(UNCATEGORIZED.to_string()),
            "[xyz]",
        ]
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (entry_name(), category_name()).prop_map(|(n, c)| Op::Add(n, c)),
            (any::<usize>(), entry_name(), category_name())
                .prop_map(|(i, n, c)| Op::Update(i, n, c)),
            any::<usize>().prop_map(Op::Delete),
            category_name().prop_map(Op::AddCategory),
            (category_name(), category_name()).prop_map(|(a, b)| Op::RenameCategory(a, b)),
            category_name().prop_map(Op::DeleteCategory),
        ]
    }

    fn pick(state: &VaultState, index: usize) -> Option<String> {
        let names = state.all_entries();
        if names.is_empty() {
            None
        } else {
            Some(names[index % names.len()].clone())
        }
    }

    proptest! {
        #[test]
        fn test_invariants_hold_across_operations(ops in proptest::collection::vec(op(), 1..40)) {
            let mut state = VaultState::new();

            for op in ops {
                match op {
                    Op::Add(name, category) => {
                        let resolved = state
                            .add_entry(&name, Entry::new("acct", "pw"), CategoryKey::parse(&category))
                            .unwrap();
                        let expected = match CategoryKey::parse(&category) {
                            CategoryKey::AllEntries => CategoryKey::Uncategorized,
                            other => other,
                        };
                        prop_assert_eq!(state.reverse_lookup(&resolved), expected);
                    }
                    Op::Update(index, new_name, category) => {
                        if let Some(old) = pick(&state, index) {
                            let _ = state.update_entry(
                                &old,
                                &new_name,
                                Entry::new("acct2", "pw2"),
                                CategoryKey::parse(&category),
                            );
                        }
                    }
                    Op::Delete(index) => {
                        if let Some(name) = pick(&state, index) {
                            state.delete_entry(&name).unwrap();
                        }
                    }
                    Op::AddCategory(name) => {
                        let _ = state.add_category(&name);
                    }
                    Op::RenameCategory(old, new) => {
                        let _ = state.rename_category(&old, &new);
                    }
                    Op::DeleteCategory(name) => {
                        let _ = state.delete_category(&name);
                    }
                }
                assert_invariants(&state);
            }
        }
    }
}
