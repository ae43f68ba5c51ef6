//! Coherence nodes.
//!
//! The hierarchy is a tree of nodes addressed by `NodeId`:
//! 1. **`Sequencer`:** A core's access port; turns loads and stores into transactions.
//! 2. **`CoherentCache`:** A cache level with directory and per-set locks.
//! 3. **`MemoryController`:** Terminates the hierarchy; always answers after a fixed latency.

use std::collections::HashMap;

use crate::config::CacheConfig;
use crate::stats::CacheStats;

use super::cache::Cache;
use super::transaction::AccessTag;

/// A core's entry point into the hierarchy.
#[derive(Debug, Clone)]
pub struct Sequencer {
    /// Core served.
    pub core: usize,
    /// Outstanding loads per block; later loads to the same block join the first.
    pub pending_loads: HashMap<u64, Vec<AccessTag>>,
    /// Loads served by an already outstanding transaction.
    pub coalesced: u64,
}

impl Sequencer {
    /// Creates a sequencer for `core`.
    pub fn new(core: usize) -> Self {
        Self {
            core,
            pending_loads: HashMap::new(),
            coalesced: 0,
        }
    }
}

/// A cache level.
#[derive(Debug, Clone)]
pub struct CoherentCache {
    /// Display name (`l1d0`, `l2`, ...).
    pub name: String,
    /// Blocks, directory, and locks.
    pub cache: Cache,
    /// Lookup latency.
    pub hit_latency: u64,
    /// Access counters.
    pub stats: CacheStats,
}

impl CoherentCache {
    /// Creates an empty cache.
    pub fn new(name: impl Into<String>, config: &CacheConfig) -> Self {
        Self {
            name: name.into(),
            cache: Cache::new(config),
            hit_latency: config.hit_latency,
            stats: CacheStats::default(),
        }
    }
}

/// Main memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryController {
    /// Response latency.
    pub latency: u64,
    /// Requests served.
    pub accesses: u64,
}

/// Any node of the hierarchy.
#[derive(Debug, Clone)]
pub enum Node {
    /// Core port.
    Sequencer(Sequencer),
    /// Cache level.
    Cache(CoherentCache),
    /// Main memory.
    Controller(MemoryController),
}

impl Node {
    /// The cache, if this node is one.
    pub const fn as_cache(&self) -> Option<&CoherentCache> {
        match self {
            Self::Cache(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable cache, if this node is one.
    pub const fn as_cache_mut(&mut self) -> Option<&mut CoherentCache> {
        match self {
            Self::Cache(c) => Some(c),
            _ => None,
        }
    }
}
