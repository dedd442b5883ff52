//! Cryptographic primitives for PassVault.
//!
//! This module provides:
//! - Authenticated encryption using XChaCha20-Poly1305
//! - The vault key type with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Key comparison is constant-time

pub mod aead;
pub mod keys;

pub use aead::{decrypt, encrypt};
pub use keys::{VaultKey, KEY_LENGTH};
