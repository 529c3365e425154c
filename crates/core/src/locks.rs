//! Keyed async locks.
//!
//! [`KeyedLocks`] hands out one async mutex per key, created on first use and
//! dropped again once nobody holds or waits for it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

/// One key's mutex plus the number of callers holding or waiting on it.
#[derive(Debug, Default)]
struct Slot {
    mutex: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

/// Registry of per-key async mutexes.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Cancelling the returned future while it waits gives up the caller's
    /// claim on the key.
    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let mutex = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = slots.entry(key.clone()).or_default();
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };
        let claim = Claim { locks: self, key };
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            _guard: guard,
            _claim: claim,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A caller's registration on a key; the slot goes away with the last one.
#[derive(Debug)]
struct Claim<'a, K: Eq + Hash> {
    locks: &'a KeyedLocks<K>,
    key: K,
}

impl<K: Eq + Hash> Drop for Claim<'_, K> {
    fn drop(&mut self) {
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let idle = match slots.get_mut(&self.key) {
            Some(slot) => {
                slot.users -= 1;
                slot.users == 0
            }
            None => false,
        };
        if idle {
            slots.remove(&self.key);
        }
    }
}

/// Exclusive access to one key. Released on drop.
#[derive(Debug)]
pub struct KeyedGuard<'a, K: Eq + Hash> {
    // Field order matters: the mutex is released before the claim is dropped.
    _guard: OwnedMutexGuard<()>,
    _claim: Claim<'a, K>,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn entries_are_dropped_after_release() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock("gloss-1".to_string()).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a".to_string()).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock("b".to_string())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("same".to_string()).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_its_slot() {
        let locks = KeyedLocks::new();
        let held = locks.lock("busy".to_string()).await;

        let waited =
            tokio::time::timeout(Duration::from_millis(10), locks.lock("busy".to_string())).await;
        assert!(waited.is_err());
        assert_eq!(locks.active(), 1);

        drop(held);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiters_on_unique_keys_leave_nothing_behind() {
        let locks = KeyedLocks::new();
        let mut held = Vec::new();
        for i in 0..5 {
            held.push(locks.lock(i).await);
        }
        for i in 0..5 {
            let _ = tokio::time::timeout(Duration::from_millis(1), locks.lock(i)).await;
        }
        assert_eq!(locks.active(), 5);

        held.clear();
        assert_eq!(locks.active(), 0);
    }
}
