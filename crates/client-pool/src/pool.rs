//! Single-flight client pool
//!
//! Each key maps to a slot holding a `tokio::sync::OnceCell`. The map lock is
//! held only to find or create the slot; construction happens on the cell, so
//! concurrent callers for a cold key wait for the one in-flight factory while
//! callers for other keys proceed independently.
//!
//! A slot whose construction failed is removed so the key is not cached. A
//! slot still under construction has an empty cell and is never idle-evicted.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::Clock;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

struct Slot<C> {
    cell: OnceCell<C>,
    /// Unix millis of the last successful acquire.
    last_used: AtomicU64,
}

impl<C> Slot<C> {
    fn new(now_millis: u64) -> Self {
        Self {
            cell: OnceCell::new(),
            last_used: AtomicU64::new(now_millis),
        }
    }
}

/// Pool of ready client handles keyed by credential fingerprint.
///
/// `C` should be cheap to clone (an `Arc` or a handle that wraps one);
/// callers receive clones of the single cached instance.
pub struct ClientPool<C> {
    slots: Mutex<HashMap<Fingerprint, Arc<Slot<C>>>>,
    clock: Arc<dyn Clock>,
}

impl<C: Clone + Send + Sync> ClientPool<C> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Return the cached handle for `key`, constructing it with `factory` if
    /// absent.
    ///
    /// At most one factory runs per key at a time; concurrent callers for the
    /// same cold key await it and receive the same handle. A factory error is
    /// returned to the caller that ran it and nothing is cached.
    pub async fn acquire<F, Fut, E>(&self, key: &Fingerprint, factory: F) -> Result<C>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<C, E>>,
        E: fmt::Display,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new(self.clock.now_millis())))
                .clone()
        };

        let result = slot
            .cell
            .get_or_try_init(|| async move {
                debug!(fingerprint = %key, "constructing pooled client");
                let client = factory().await.map_err(|e| e.to_string())?;
                metrics::counter!("client_pool_constructions_total").increment(1);
                Ok::<C, String>(client)
            })
            .await;

        match result {
            Ok(client) => {
                slot.last_used
                    .store(self.clock.now_millis(), Ordering::Relaxed);
                Ok(client.clone())
            }
            Err(message) => {
                let mut slots = self.slots.lock().await;
                let is_current = slots
                    .get(key)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot));
                if is_current && slot.cell.get().is_none() {
                    slots.remove(key);
                }
                warn!(fingerprint = %key, error = %message, "pooled client construction failed");
                Err(Error::Construction {
                    key: key.clone(),
                    message,
                })
            }
        }
    }

    /// Drop the handle for `key`. Returns whether one was cached.
    ///
    /// Callers already holding a clone keep it; the next `acquire` builds a
    /// new handle.
    pub async fn invalidate(&self, key: &Fingerprint) -> bool {
        let removed = self.slots.lock().await.remove(key).is_some();
        if removed {
            metrics::counter!("client_pool_invalidations_total").increment(1);
            info!(fingerprint = %key, "pooled client invalidated");
        }
        removed
    }

    /// Drop handles not acquired within `max_idle`. Returns the number removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now_millis();
        let max_idle_millis = max_idle.as_millis() as u64;
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| {
            if slot.cell.get().is_none() {
                return true;
            }
            let last_used = slot.last_used.load(Ordering::Relaxed);
            now.saturating_sub(last_used) < max_idle_millis
        });
        let removed = before - slots.len();
        if removed > 0 {
            metrics::counter!("client_pool_idle_evictions_total").increment(removed as u64);
            debug!(removed, remaining = slots.len(), "evicted idle pooled clients");
        }
        removed
    }

    /// Whether a constructed handle is cached for `key`.
    pub async fn contains(&self, key: &Fingerprint) -> bool {
        self.slots
            .lock()
            .await
            .get(key)
            .is_some_and(|slot| slot.cell.get().is_some())
    }

    /// Number of cached or in-flight slots.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
