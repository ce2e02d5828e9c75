//! Keyed one-shot timers that can be cancelled.
//!
//! Each armed key owns one sleeping Tokio task. Arming a key that is
//! already armed does nothing, and cancelling a key that is not armed
//! does nothing, so callers never need to check first.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

#[derive(Debug)]
struct Pending {
    /// Distinguishes this arming from a later one under the same key.
    generation: u64,
    abort: AbortHandle,
}

/// A map of key to scheduled action.
///
/// The action runs at most once. A fired timer removes its own key before
/// running the action, so the key may be re-armed from inside the action.
#[derive(Debug)]
pub struct DeferredTimers<K>
where
    K: Eq + Hash,
{
    pending: Arc<DashMap<K, Pending>>,
    generation: AtomicU64,
}

impl<K> Default for DeferredTimers<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DeferredTimers<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Runs `action` after `delay` unless `key` is cancelled first.
    ///
    /// Returns `false` without scheduling anything if `key` is already
    /// armed. Must be called from within a Tokio runtime.
    pub fn arm<F>(&self, key: K, delay: Duration, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.pending.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(?key, "timer already armed");
                false
            }
            Entry::Vacant(slot) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let pending = Arc::clone(&self.pending);
                let task_key = key.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let still_ours = pending
                        .remove_if(&task_key, |_, entry| entry.generation == generation)
                        .is_some();
                    if still_ours {
                        trace!(key = ?task_key, "timer fired");
                        action.await;
                    }
                });
                slot.insert(Pending {
                    generation,
                    abort: task.abort_handle(),
                });
                debug!(?key, delay_ms = delay.as_millis() as u64, "timer armed");
                true
            }
        }
    }

    /// Disarms `key`. Returns `true` if a pending timer was removed.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, entry)) => {
                entry.abort.abort();
                debug!(?key, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Disarms every key for which `matches` returns `true`. Returns how
    /// many were removed.
    pub fn cancel_matching(&self, mut matches: impl FnMut(&K) -> bool) -> usize {
        let mut removed = 0;
        self.pending.retain(|key, entry| {
            if matches(key) {
                entry.abort.abort();
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            debug!(removed, "timers cancelled");
        }
        removed
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Returns `true` if any armed key satisfies `matches`.
    pub fn any_armed(&self, mut matches: impl FnMut(&K) -> bool) -> bool {
        self.pending.iter().any(|entry| matches(entry.key()))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn cancel_all(&self) -> usize {
        self.cancel_matching(|_| true)
    }
}

impl<K> Drop for DeferredTimers<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.pending.retain(|_, entry| {
            entry.abort.abort();
            false
        });
    }
}
