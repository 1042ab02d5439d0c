// Bounded TTL cache for resolved signal records
use crate::domain::signal::{ResolvedSignal, SignalKey};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry {
    records: Vec<ResolvedSignal>,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<SignalKey, CacheEntry>,
    // Front is least recently used.
    order: VecDeque<SignalKey>,
}

/// Size-bounded, TTL-limited store mapping signal keys to resolved
/// records. An empty record vector is a valid negative entry; it marks a
/// confirmed absence and suppresses upstream re-queries until the TTL
/// expires.
///
/// The lock is held only for map bookkeeping; callers never fetch while
/// holding it. Entries are replaced wholesale on `put`, so a concurrent
/// writer for the same key is last-write-wins.
pub struct SignalCache {
    inner: Mutex<CacheInner>,
    max_size: usize,
    ttl: Duration,
}

impl SignalCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_size: max_size.max(1),
            ttl,
        }
    }

    /// Records for a key, fresh or stale. Touches recency on hit.
    pub fn lookup(&self, key: &SignalKey) -> Option<Vec<ResolvedSignal>> {
        let mut inner = self.inner.lock().unwrap();
        let records = inner.entries.get(key).map(|e| e.records.clone())?;
        Self::touch(&mut inner.order, key);
        Some(records)
    }

    /// True when the key is present and younger than the TTL. Does not
    /// touch recency; freshness probes are not uses.
    pub fn is_fresh(&self, key: &SignalKey) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(key)
            .is_some_and(|e| e.inserted_at.elapsed() < self.ttl)
    }

    /// Replaces the full record set for a key and evicts the least
    /// recently used entries once over capacity.
    pub fn put(&self, key: SignalKey, records: Vec<ResolvedSignal>) {
        let mut inner = self.inner.lock().unwrap();
        let entry = CacheEntry {
            records,
            inserted_at: Instant::now(),
        };
        if inner.entries.insert(key.clone(), entry).is_some() {
            Self::touch(&mut inner.order, &key);
        } else {
            inner.order.push_back(key);
        }
        while inner.entries.len() > self.max_size {
            let Some(evicted) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&evicted);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn touch(order: &mut VecDeque<SignalKey>, key: &SignalKey) {
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.clone());
    }
}
