//! Storage provider abstraction for PassVault.
//!
//! This module provides a trait-based interface for the blob store that
//! holds the vault's artifacts, with a local filesystem backend and an
//! in-memory backend for tests.
//!
//! # Design Principles
//! - Atomic replacement: every write swaps in a complete blob
//! - Absence is not an error: missing blobs read back as `None`
//! - Synchronous: vault mutations flush before returning to the caller

pub mod local;
pub mod memory;
pub mod provider;

pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use provider::StorageProvider;
