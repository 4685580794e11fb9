//! ============================================================================
//! Keyed Locks - Per-handle serialization of ledger pipelines
//! ============================================================================
//! Every mutating operation runs load -> settle -> mutate -> persist while
//! holding its handle's lock, so concurrent requests against one account
//! cannot lose updates. No cross-handle ordering is imposed.
//! ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Maximum number of tracked handles before idle locks are evicted
const MAX_TRACKED_LOCKS: usize = 1024;

pub(crate) struct KeyedLocks {
    inner: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Acquire the exclusive lock for `key`, creating it on first use.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.write().await;
            if map.len() >= MAX_TRACKED_LOCKS && !map.contains_key(key) {
                // An entry referenced only by the map has no holder or waiter
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
