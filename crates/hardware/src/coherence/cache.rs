//! Set-associative storage with a per-block directory.
//!
//! A `Cache` holds, for every `(set, way)`:
//! 1. **`CacheBlock`:** committed tag, transient tag, MESI state, last access cycle.
//! 2. **`DirectoryEntry`:** which upper-level nodes share the block and which one owns it.
//!
//! Each set also has one `DirectoryLock`. Every protocol transition on a set happens
//! while a transaction holds that lock.

use std::collections::BTreeSet;

use crate::common::NodeId;
use crate::config::{CacheConfig, ReplacementPolicy};

use super::mesi::MesiState;
use super::transaction::TxId;

/// One cache line slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheBlock {
    /// Block address of the committed contents.
    pub tag: u64,
    /// Block address being brought into this slot by the lock holder.
    pub transient_tag: Option<u64>,
    /// Coherence state.
    pub state: MesiState,
    /// Cycle of the last lookup that selected this slot.
    pub last_access: u64,
}

/// Sharers and owner of one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Upper-level node with exclusive rights, if any.
    pub owner: Option<NodeId>,
    /// Upper-level nodes holding a copy.
    pub sharers: BTreeSet<NodeId>,
}

impl DirectoryEntry {
    /// Drops every sharer and the owner.
    pub fn clear(&mut self) {
        self.owner = None;
        self.sharers.clear();
    }

    /// Removes `node` from the sharers, and from ownership if it owns the block.
    pub fn remove(&mut self, node: NodeId) {
        let _ = self.sharers.remove(&node);
        if self.owner == Some(node) {
            self.owner = None;
        }
    }

    /// Checks the directory invariants for a block in `state`.
    ///
    /// The owner is a sharer; a Modified block has at most one sharer; a Shared
    /// block has no owner.
    pub fn is_consistent(&self, state: MesiState) -> bool {
        let owner_shares = self.owner.is_none_or(|o| self.sharers.contains(&o));
        let state_ok = match state {
            MesiState::Modified => self.sharers.len() <= 1,
            MesiState::Shared => self.owner.is_none(),
            MesiState::Exclusive => true,
            MesiState::Invalid => self.owner.is_none() && self.sharers.is_empty(),
        };
        owner_shares && state_ok
    }
}

/// Per-set mutual exclusion for coherence transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectoryLock {
    /// Transaction holding the lock.
    pub holder: Option<TxId>,
}

/// Result of looking an address up in a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup {
    /// Set index.
    pub set: usize,
    /// Matching way (committed or transient), if any.
    pub way: Option<usize>,
    /// Whether the committed tag matched a valid block.
    pub hit: bool,
}

/// Blocks, directory, and locks of one cache.
#[derive(Debug, Clone)]
pub struct Cache {
    sets: usize,
    assoc: usize,
    line_size: u64,
    policy: ReplacementPolicy,
    blocks: Vec<CacheBlock>,
    directory: Vec<DirectoryEntry>,
    locks: Vec<DirectoryLock>,
}

impl Cache {
    /// Creates an empty cache with the configured geometry.
    pub fn new(config: &CacheConfig) -> Self {
        let slots = config.sets * config.assoc;
        Self {
            sets: config.sets,
            assoc: config.assoc,
            line_size: config.line_size,
            policy: config.policy,
            blocks: vec![CacheBlock::default(); slots],
            directory: vec![DirectoryEntry::default(); slots],
            locks: vec![DirectoryLock::default(); config.sets],
        }
    }

    /// Number of sets.
    pub const fn sets(&self) -> usize {
        self.sets
    }

    /// Ways per set.
    pub const fn assoc(&self) -> usize {
        self.assoc
    }

    /// Aligns `addr` down to its block address.
    pub const fn block_addr(&self, addr: u64) -> u64 {
        addr & !(self.line_size - 1)
    }

    /// Set index of `addr`.
    pub const fn set_index(&self, addr: u64) -> usize {
        ((addr / self.line_size) as usize) & (self.sets - 1)
    }

    const fn slot(&self, set: usize, way: usize) -> usize {
        set * self.assoc + way
    }

    /// Block in `(set, way)`.
    pub fn block(&self, set: usize, way: usize) -> &CacheBlock {
        &self.blocks[self.slot(set, way)]
    }

    /// Mutable block in `(set, way)`.
    pub fn block_mut(&mut self, set: usize, way: usize) -> &mut CacheBlock {
        let i = self.slot(set, way);
        &mut self.blocks[i]
    }

    /// Directory entry of `(set, way)`.
    pub fn dir(&self, set: usize, way: usize) -> &DirectoryEntry {
        &self.directory[self.slot(set, way)]
    }

    /// Mutable directory entry of `(set, way)`.
    pub fn dir_mut(&mut self, set: usize, way: usize) -> &mut DirectoryEntry {
        let i = self.slot(set, way);
        &mut self.directory[i]
    }

    /// Lock of `set`.
    pub fn lock(&self, set: usize) -> DirectoryLock {
        self.locks[set]
    }

    /// Sets the holder of the lock of `set`.
    pub fn set_lock(&mut self, set: usize, holder: Option<TxId>) {
        self.locks[set].holder = holder;
    }

    /// Way holding a valid copy of `addr`.
    pub fn find(&self, addr: u64) -> Option<(usize, usize)> {
        let tag = self.block_addr(addr);
        let set = self.set_index(addr);
        (0..self.assoc)
            .find(|&w| {
                let b = self.block(set, w);
                b.state.is_valid() && b.tag == tag
            })
            .map(|w| (set, w))
    }

    /// Looks `addr` up.
    ///
    /// Transient tags are only consulted when `check_transient` is set, which the
    /// caller does while another transaction holds the set.
    pub fn lookup(&self, addr: u64, check_transient: bool) -> Lookup {
        let tag = self.block_addr(addr);
        let set = self.set_index(addr);
        if let Some((_, way)) = self.find(addr) {
            return Lookup {
                set,
                way: Some(way),
                hit: true,
            };
        }
        let way = if check_transient {
            (0..self.assoc).find(|&w| self.block(set, w).transient_tag == Some(tag))
        } else {
            None
        };
        Lookup { set, way, hit: false }
    }

    /// Chooses the way to replace in `set`.
    ///
    /// An invalid way is taken first; otherwise the policy decides. `random`
    /// supplies a pseudo-random value for the random policy.
    pub fn victim(&self, set: usize, random: u64) -> usize {
        if let Some(way) = (0..self.assoc).find(|&w| !self.block(set, w).state.is_valid()) {
            return way;
        }
        match self.policy {
            ReplacementPolicy::Lru => (0..self.assoc)
                .min_by_key(|&w| self.block(set, w).last_access)
                .unwrap_or(0),
            ReplacementPolicy::Random => (random % self.assoc as u64) as usize,
        }
    }

    /// Iterates every slot with its block and directory entry.
    pub fn slots(&self) -> impl Iterator<Item = (usize, usize, &CacheBlock, &DirectoryEntry)> + '_ {
        self.blocks
            .iter()
            .zip(&self.directory)
            .enumerate()
            .map(|(i, (b, d))| (i / self.assoc, i % self.assoc, b, d))
    }
}
