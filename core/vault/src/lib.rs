//! Vault engine for PassVault.
//!
//! This module provides:
//! - The in-memory entry/category state and its invariant-preserving mutations
//! - The persistent store, with each entry payload encrypted on its own
//! - Key artifact loading and first-run key generation
//! - Case-insensitive search and the bulk export projection
//!
//! # Architecture
//! The engine sits between the user interface and a storage provider.
//! Every mutation is applied to a staged copy of the state, flushed
//! through the store, and committed only once the flush succeeded.

pub mod config;
pub mod engine;
pub mod keyfile;
pub mod model;
pub mod search;
pub mod shared;
pub mod state;
pub mod store;

pub use config::{LoadPolicy, VaultConfig, VaultVersion, CONFIG_FILENAME};
pub use engine::Vault;
pub use keyfile::load_or_create_key;
pub use model::{Entry, EntryView, ExportRow, Snapshot};
pub use search::Matches;
pub use shared::SharedVault;
pub use state::{derive_all_entries, resolve_unique_name, RepairReport, VaultState};
pub use store::{EntryFailure, EntryFailureKind, LoadedVault, VaultStore};
