//! Common utilities and types shared across PassVault modules.
//!
//! This module provides the error taxonomy and the category key type used
//! by the storage, crypto and vault crates.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CategoryKey, ALL_ENTRIES, UNCATEGORIZED};
