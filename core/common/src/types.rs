//! Common types used throughout PassVault.

use std::fmt;

/// Display name of the derived category that lists every entry.
pub const ALL_ENTRIES: &str = "All";

/// Display name of the default category for entries without a home.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Identifies a category, with the two system-managed categories tagged
/// explicitly instead of being compared by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryKey {
    /// Derived view over the whole entry table. Never stored or mutated.
    AllEntries,
    /// Default home for entries; always present, never renamed or deleted.
    Uncategorized,
    /// A user-defined category.
    Named(String),
}

impl CategoryKey {
    /// Parse a category name as supplied by a caller.
    ///
    /// The reserved display names map to their tagged variants and an
    /// empty string means "no category chosen", which is the derived
    /// all-entries view.
    pub fn parse(name: &str) -> Self {
        match name {
            "" | ALL_ENTRIES => Self::AllEntries,
            UNCATEGORIZED => Self::Uncategorized,
            other => Self::Named(other.to_string()),
        }
    }

    /// Re-parse a `Named` key so that reserved or empty names map to their
    /// tagged variants.
    pub fn canonical(self) -> Self {
        match self {
            Self::Named(name) => Self::parse(&name),
            other => other,
        }
    }

    /// The display name used for this category on disk and in listings.
    pub fn name(&self) -> &str {
        match self {
            Self::AllEntries => ALL_ENTRIES,
            Self::Uncategorized => UNCATEGORIZED,
            Self::Named(name) => name,
        }
    }

    /// Whether the category is system-managed.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, Self::Named(_))
    }

    /// Whether the category holds real membership (everything except the
    /// derived all-entries view).
    pub fn is_real(&self) -> bool {
        !matches!(self, Self::AllEntries)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<&str> for CategoryKey {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}
