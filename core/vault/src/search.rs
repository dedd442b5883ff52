//! Case-insensitive entry search.

use std::collections::btree_map;

use crate::model::{Entry, EntryView};

/// Lazy iterator over entries whose name or account contains a needle,
/// ignoring case.
///
/// The iterator borrows the vault state and is finite. Clone it before
/// consuming to walk the same matches again.
#[derive(Clone)]
pub struct Matches<'a> {
    needle: String,
    entries: btree_map::Iter<'a, String, Entry>,
}

impl<'a> Matches<'a> {
    pub(crate) fn new(needle: &str, entries: btree_map::Iter<'a, String, Entry>) -> Self {
        Self {
            needle: needle.to_lowercase(),
            entries,
        }
    }

    fn is_match(&self, name: &str, entry: &Entry) -> bool {
        name.to_lowercase().contains(&self.needle)
            || entry.account.to_lowercase().contains(&self.needle)
    }
}

impl Iterator for Matches<'_> {
    type Item = EntryView;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((name, entry)) = self.entries.next() {
            if self.is_match(name, entry) {
                return Some(EntryView::new(name, entry));
            }
        }
        None
    }
}
