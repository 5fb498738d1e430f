//! Keyed async mutexes.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type Registry<K> = Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>;

/// One async mutex per key, created on first use.
///
/// An entry is removed when the last guard for its key is dropped and no
/// other task is waiting on it, so the registry only holds keys in use.
pub struct KeyedLocks<K> {
    registry: Registry<K>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            registry: Arc::default(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyedGuard<K> {
        let mutex = {
            let mut registry = lock_registry(&self.registry);
            Arc::clone(registry.entry(key.clone()).or_default())
        };
        let guard = mutex.lock_owned().await;

        KeyedGuard {
            guard: Some(guard),
            key: key.clone(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one key of a [`KeyedLocks`].
pub struct KeyedGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    registry: Registry<K>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        // Release first so the count below only sees the registry and waiters.
        drop(self.guard.take());

        let mut registry = lock_registry(&self.registry);
        if registry
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            registry.remove(&self.key);
        }
    }
}

// The registry is only touched in short sections that cannot panic, so a
// poisoned lock still holds a consistent map.
fn lock_registry<K>(
    registry: &Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
) -> MutexGuard<'_, HashMap<K, Arc<tokio::sync::Mutex<()>>>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
