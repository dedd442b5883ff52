//! Single-writer handle for hosts with concurrent callers.

use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::Vault;

/// Cloneable handle that serializes every vault operation behind one lock.
///
/// The engine's multi-step invariant maintenance is not atomic on its own,
/// so reads and writes alike go through [`with`](Self::with).
#[derive(Clone)]
pub struct SharedVault {
    inner: Arc<Mutex<Vault>>,
}

impl SharedVault {
    pub fn new(vault: Vault) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vault)),
        }
    }

    /// Run `f` with exclusive access to the vault.
    ///
    /// A panic in another caller does not lock the vault out: mutations
    /// only replace the state after a successful flush, so the state
    /// behind a poisoned lock is still consistent.
    pub fn with<T>(&self, f: impl FnOnce(&mut Vault) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use passvault_storage::MemoryProvider;
    use std::thread;

    fn shared() -> SharedVault {
        let vault = Vault::open(VaultConfig::default(), Arc::new(MemoryProvider::new())).unwrap();
        SharedVault::new(vault)
    }

    #[test]
    fn test_concurrent_adds_resolve_unique_names() {
        let vault = shared();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let vault = vault.clone();
                thread::spawn(move || vault.with(|v| v.add_entry("x", "acct", "pw", "")).unwrap())
            })
            .collect();

        let mut resolved: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        resolved.sort();
        resolved.dedup();

        assert_eq!(resolved.len(), 8);
        assert_eq!(vault.with(|v| v.len()), 8);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let vault = shared();
        vault.with(|v| v.add_entry("a", "acct", "pw", "")).unwrap();

        let poisoner = vault.clone();
        let _ = thread::spawn(move || {
            poisoner.with(|_| panic!("caller panicked"));
        })
        .join();

        assert_eq!(vault.with(|v| v.all_entries().to_vec()), vec!["a"]);
    }
}
