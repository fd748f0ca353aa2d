// devnet-rpc/src/cache.rs

use devnet_engine::TransactionResult;
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded store of transaction results, keyed by transaction hash.
///
/// Safe to share between request handlers; it has its own lock and does not
/// depend on the submission gate.
pub struct ResultCache {
    cache: RwLock<FifoCache<String, TransactionResult>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(FifoCache::new(capacity)),
        }
    }

    pub fn get(&self, tx_hash: &str) -> Option<TransactionResult> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tx_hash)
            .cloned()
    }

    pub fn put(&self, tx_hash: String, result: TransactionResult) {
        let evicted = self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tx_hash, result);
        if let Some(old) = evicted {
            tracing::debug!("Evicted transaction result {}", old);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).capacity
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Insertion-ordered map with first-in-first-out eviction.
///
/// The order log is append-only and holds one entry per live key. An
/// overwrite keeps the key's first position, so it is evicted when that
/// entry reaches the head. Log entries whose key is already gone are skipped.
/// The log never grows past the number of live keys.
struct FifoCache<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Clone + std::hash::Hash + Eq, V> FifoCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: std::hash::Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    /// Insert or overwrite; returns the key evicted to make room, if any
    fn insert(&mut self, key: K, value: V) -> Option<K> {
        if let Some(slot) = self.map.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.map.insert(key, value);
        evicted
    }

    fn evict_oldest(&mut self) -> Option<K> {
        while let Some(key) = self.order.pop_front() {
            if self.map.remove(&key).is_some() {
                return Some(key);
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
