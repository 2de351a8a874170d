//! Keyed single-flight memoization.
//!
//! [`ResultCache`] sits in front of every expensive pipeline step. For a
//! given key the compute future runs at most once at a time: the first
//! caller spawns it, later callers attach to the same in-flight result.
//!
//! ```text
//! caller A ─┐                         ┌─► Ready(value)   (kept for process lifetime)
//! caller B ─┼─► ResultCache ─► task ──┤
//! caller C ─┘     (Pending)           └─► removed on error (next call retries)
//! ```
//!
//! The computation runs in its own tokio task, so a caller that times out
//! or is dropped does not cancel it for the others.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::error::{ResolveError, ResolveResult};

type Outcome<V> = Option<ResolveResult<V>>;

enum Entry<V> {
    Pending(watch::Receiver<Outcome<V>>),
    Ready(V),
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    coalesced: AtomicU64,
    computations: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a ready entry.
    pub hits: u64,
    /// Calls that attached to an in-flight computation.
    pub coalesced: u64,
    /// Computations started.
    pub computations: u64,
    /// Computations that ended in an error.
    pub failures: u64,
    /// Ready plus pending entries.
    pub entries: usize,
}

/// A concurrency-safe memoization table with one key space.
pub struct ResultCache<K, V> {
    name: &'static str,
    entries: Arc<Mutex<HashMap<K, Entry<V>>>>,
    counters: Arc<Counters>,
}

impl<K, V> fmt::Debug for ResultCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("name", &self.name)
            .field("entries", &lock(&self.entries).len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Entries are only ever replaced whole, so a poisoned map is still
    // consistent.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache. `name` appears in log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Return the cached value for `key`, or run `compute` to produce it.
    ///
    /// While a computation for `key` is in flight, concurrent callers wait
    /// on it instead of starting another. Successful values are kept;
    /// errors are handed to every waiter and then forgotten.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> ResolveResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolveResult<V>> + Send + 'static,
    {
        let rx = {
            let mut entries = lock(&self.entries);
            match entries.get(&key) {
                Some(Entry::Ready(value)) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[{}] hit for {:?}", self.name, key);
                    return Ok(value.clone());
                }
                Some(Entry::Pending(rx)) => {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[{}] joining in-flight computation for {:?}", self.name, key);
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    entries.insert(key.clone(), Entry::Pending(rx.clone()));
                    self.counters.computations.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[{}] computing {:?}", self.name, key);
                    self.spawn_computation(key, compute(), tx);
                    rx
                }
            }
        };

        wait_for(rx).await
    }

    fn spawn_computation<Fut>(&self, key: K, fut: Fut, tx: watch::Sender<Outcome<V>>)
    where
        Fut: Future<Output = ResolveResult<V>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let counters = Arc::clone(&self.counters);
        let name = self.name;

        tokio::spawn(async move {
            // A nested task turns a panic into an error instead of leaving
            // the entry pending forever.
            let outcome = match tokio::spawn(fut).await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(ResolveError::upstream(
                    name,
                    format!("computation aborted: {join_err}"),
                )),
            };

            {
                let mut entries = lock(&entries);
                match &outcome {
                    Ok(value) => {
                        entries.insert(key, Entry::Ready(value.clone()));
                    }
                    Err(err) => {
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                        log::debug!("[{}] computation for {:?} failed: {}", name, key, err);
                        entries.remove(&key);
                    }
                }
            }

            // No receivers left is fine: everyone gave up, the map is updated.
            tx.send_replace(Some(outcome));
        });
    }

    /// Whether a ready value exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        matches!(lock(&self.entries).get(key), Some(Entry::Ready(_)))
    }

    /// Drop a ready value. In-flight computations are left alone.
    /// Returns `true` if a value was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut entries = lock(&self.entries);
        if matches!(entries.get(key), Some(Entry::Ready(_))) {
            entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Drop every ready value. In-flight computations are left alone.
    pub fn clear(&self) {
        lock(&self.entries).retain(|_, entry| matches!(entry, Entry::Pending(_)));
    }

    /// Number of entries, ready or pending.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

async fn wait_for<V: Clone>(mut rx: watch::Receiver<Outcome<V>>) -> ResolveResult<V> {
    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(outcome) = current {
            return outcome;
        }
        if rx.changed().await.is_err() {
            // Sender gone; it may still have published before dropping.
            return rx.borrow().clone().unwrap_or_else(|| {
                Err(ResolveError::upstream(
                    "cache",
                    "computation dropped before completing",
                ))
            });
        }
    }
}
