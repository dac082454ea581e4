//! Bounded LRU cache of loaded business networks, keyed by archive hash.
//!
//! Loading a network means parsing the archive and binding its scripts, so
//! every Context asks the cache first.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::archive::BusinessNetworkDefinition;
use crate::executor::CompiledScriptBundle;

/// Default number of networks kept.
pub const DEFAULT_CAPACITY: usize = 8;

/// A parsed definition plus its bound scripts.
#[derive(Debug)]
pub struct LoadedNetwork {
    pub hash: String,
    pub definition: Arc<BusinessNetworkDefinition>,
    pub scripts: Arc<CompiledScriptBundle>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct NetworkCache {
    // hash -> (network, last access tick)
    entries: HashMap<String, (Arc<LoadedNetwork>, u64)>,
    // last access tick -> hash; the first key is the LRU entry
    access_index: BTreeMap<u64, String>,
    tick: u64,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl NetworkCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            access_index: BTreeMap::new(),
            tick: 0,
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn get(&mut self, hash: &str) -> Option<Arc<LoadedNetwork>> {
        let tick = self.next_tick();
        match self.entries.get_mut(hash) {
            Some((network, last_access)) => {
                self.access_index.remove(last_access);
                *last_access = tick;
                self.access_index.insert(tick, hash.to_string());
                self.hits += 1;
                Some(network.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a network, evicting the least recently used entry when full.
    pub fn put(&mut self, network: Arc<LoadedNetwork>) {
        let hash = network.hash.clone();
        if let Some((_, last_access)) = self.entries.remove(&hash) {
            self.access_index.remove(&last_access);
        }
        while self.entries.len() >= self.capacity {
            if !self.evict_lru() {
                break;
            }
        }
        let tick = self.next_tick();
        self.access_index.insert(tick, hash.clone());
        self.entries.insert(hash, (network, tick));
    }

    fn evict_lru(&mut self) -> bool {
        let Some((&oldest, _)) = self.access_index.iter().next() else {
            return false;
        };
        if let Some(hash) = self.access_index.remove(&oldest) {
            self.entries.remove(&hash);
            self.evictions += 1;
            tracing::debug!(hash = %hash, "Evicted business network from cache");
        }
        true
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_index.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

impl Default for NetworkCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
