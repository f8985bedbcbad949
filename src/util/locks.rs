//! Per-entity async locks.
//!
//! Roster and ballot mutations are read-check-write sequences against an external
//! store. Each entity gets its own `tokio::sync::Mutex` so the whole sequence runs
//! as one unit while unrelated entities proceed in parallel.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of lazily created per-key locks.
pub struct EntityLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> EntityLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for `key`, waiting while another holder exists.
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        slot.lock_owned().await
    }

    /// Drop slots nobody currently holds or waits on.
    pub fn prune_idle(&self) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        before - slots.len()
    }

    /// Number of tracked slots.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no slots are tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl<K> Default for EntityLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
