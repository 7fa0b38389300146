//! Per-key async mutual exclusion.
//!
//! Serializes work on the same key (for example one account) while work on
//! different keys runs in parallel. Slots are created on demand and dropped
//! once nobody holds or waits on them, so the map only grows with the number
//! of keys that are in flight.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard returned by [`KeyedMutex::lock`]; the key is released on drop.
pub type KeyGuard = OwnedMutexGuard<()>;

pub struct KeyedMutex<K> {
    slots: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until `key` is free and take it.
    pub async fn lock(&self, key: &K) -> KeyGuard {
        self.slot(key).lock_owned().await
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(slot) = slots.get(key).and_then(Weak::upgrade) {
            return slot;
        }

        slots.retain(|_, slot| slot.strong_count() > 0);

        let slot = Arc::new(AsyncMutex::new(()));
        slots.insert(key.clone(), Arc::downgrade(&slot));
        slot
    }

    /// Number of keys currently held or awaited
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}
