//! The memory system: topology, transaction table, and event loop.
//!
//! Nodes are created once and linked by an adjacency table (`next`), so
//! requests travel by `NodeId` rather than by reference. The topology is:
//!
//! ```text
//! seq_i(c) -> l1i(c) \
//!                      l2 -> mc
//! seq_d(c) -> l1d(c) /
//! ```
//!
//! Cores talk to their two sequencers through `load`/`store` and collect
//! finished accesses with `drain_completions`. Tests and tools can also inject
//! raw protocol requests (`find_and_lock`, `read_request`, `write_request`).

use std::collections::HashMap;

use tracing::debug;

use crate::common::NodeId;
use crate::config::MemoryConfig;
use crate::sim::EventQueue;
use crate::stats::CacheStats;

use super::cache::{Cache, DirectoryEntry};
use super::mesi::MesiState;
use super::node::{CoherentCache, MemoryController, Node, Sequencer};
use super::transaction::{AccessTag, MemEvent, Parent, Reply, Transaction, TxId, TxKind};

/// Sequencers of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorePorts {
    /// Instruction fetch port.
    pub fetch: NodeId,
    /// Data port.
    pub data: NodeId,
}

/// A finished processor access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Core that issued the access.
    pub core: usize,
    /// Tag given by the core.
    pub tag: AccessTag,
}

/// Caches, memory controller, and every in-flight coherence transaction.
#[derive(Debug, Clone)]
pub struct MemorySystem {
    pub(super) nodes: Vec<Node>,
    pub(super) next: Vec<Option<NodeId>>,
    ports: Vec<CorePorts>,
    l1_i: Vec<NodeId>,
    l1_d: Vec<NodeId>,
    l2: NodeId,
    controller: NodeId,
    pub(super) events: EventQueue<MemEvent>,
    pub(super) txs: HashMap<TxId, Transaction>,
    next_tx: u64,
    rng: u64,
    pub(super) message_latency: u64,
    pub(super) completions: Vec<Completion>,
    pub(super) external: Vec<(TxId, Reply)>,
}

impl MemorySystem {
    /// Builds the hierarchy for `num_cores` cores.
    ///
    /// # Arguments
    ///
    /// * `config` - Cache geometry and latencies.
    /// * `num_cores` - Number of cores; each gets private L1 caches.
    /// * `seed` - Seed of the retry backoff generator.
    pub fn new(config: &MemoryConfig, num_cores: usize, seed: u64) -> Self {
        let mut nodes = Vec::new();
        let mut next = Vec::new();
        let mut add = |node: Node, parent: Option<NodeId>| {
            nodes.push(node);
            next.push(parent);
            NodeId(nodes.len() - 1)
        };

        let controller = add(
            Node::Controller(MemoryController {
                latency: config.controller_latency,
                accesses: 0,
            }),
            None,
        );
        let l2 = add(Node::Cache(CoherentCache::new("l2", &config.l2)), Some(controller));

        let mut ports = Vec::with_capacity(num_cores);
        let mut l1_i = Vec::with_capacity(num_cores);
        let mut l1_d = Vec::with_capacity(num_cores);
        for core in 0..num_cores {
            let i = add(Node::Cache(CoherentCache::new(format!("l1i{core}"), &config.l1_i)), Some(l2));
            let d = add(Node::Cache(CoherentCache::new(format!("l1d{core}"), &config.l1_d)), Some(l2));
            let fetch = add(Node::Sequencer(Sequencer::new(core)), Some(i));
            let data = add(Node::Sequencer(Sequencer::new(core)), Some(d));
            l1_i.push(i);
            l1_d.push(d);
            ports.push(CorePorts { fetch, data });
        }

        Self {
            nodes,
            next,
            ports,
            l1_i,
            l1_d,
            l2,
            controller,
            events: EventQueue::new(),
            txs: HashMap::new(),
            next_tx: 0,
            rng: seed.max(1),
            message_latency: config.message_latency,
            completions: Vec::new(),
            external: Vec::new(),
        }
    }

    /// Sequencers of `core`.
    pub fn ports(&self, core: usize) -> CorePorts {
        self.ports[core]
    }

    /// Private instruction cache of `core`.
    pub fn l1_instruction(&self, core: usize) -> NodeId {
        self.l1_i[core]
    }

    /// Private data cache of `core`.
    pub fn l1_data(&self, core: usize) -> NodeId {
        self.l1_d[core]
    }

    /// The shared cache.
    pub const fn shared_cache(&self) -> NodeId {
        self.l2
    }

    /// The memory controller.
    pub const fn controller(&self) -> NodeId {
        self.controller
    }

    /// Next level of `node`.
    pub fn next_of(&self, node: NodeId) -> Option<NodeId> {
        self.next.get(node.0).copied().flatten()
    }

    /// Current memory-system cycle.
    pub const fn cycle(&self) -> u64 {
        self.events.cycle()
    }

    /// Issues a load of `paddr` through `sequencer`.
    ///
    /// Loads to a block that already has a load outstanding on this sequencer
    /// complete together with it.
    pub fn load(&mut self, sequencer: NodeId, paddr: u64, tag: AccessTag) {
        let Some(l1) = self.next_of(sequencer) else {
            return;
        };
        let block = self.block_addr(l1, paddr);
        let Some(Node::Sequencer(seq)) = self.nodes.get_mut(sequencer.0) else {
            return;
        };
        if let Some(waiting) = seq.pending_loads.get_mut(&block) {
            waiting.push(tag);
            seq.coalesced += 1;
            return;
        }
        let _ = seq.pending_loads.insert(block, vec![tag]);
        let parent = Parent::Access {
            sequencer,
            block,
            store: None,
        };
        let _ = self.spawn(l1, TxKind::Load, block, parent, 0);
    }

    /// Issues a store to `paddr` through `sequencer`.
    pub fn store(&mut self, sequencer: NodeId, paddr: u64, tag: AccessTag) {
        let Some(l1) = self.next_of(sequencer) else {
            return;
        };
        let block = self.block_addr(l1, paddr);
        let parent = Parent::Access {
            sequencer,
            block,
            store: Some(tag),
        };
        let _ = self.spawn(l1, TxKind::Store, block, parent, 0);
    }

    /// Starts a bare lookup-and-lock of `addr` at `node`.
    ///
    /// The transaction replies through `take_external_replies` once it holds the
    /// lock (or with an error if `is_blocking` and the set is busy) and keeps the
    /// lock until `release`.
    pub fn find_and_lock(
        &mut self,
        node: NodeId,
        addr: u64,
        is_blocking: bool,
        is_read: bool,
        is_retry: bool,
    ) -> TxId {
        let block = self.block_addr(node, addr);
        let id = self.spawn(
            node,
            TxKind::FindAndLock { is_blocking, is_read },
            block,
            Parent::External,
            0,
        );
        if let Some(tx) = self.txs.get_mut(&id) {
            tx.is_retry = is_retry;
        }
        id
    }

    /// Releases the lock held by a bare `find_and_lock`.
    ///
    /// # Returns
    ///
    /// False if `tx` is not a held lookup.
    pub fn release(&mut self, tx: TxId) -> bool {
        match self.txs.get(&tx) {
            Some(t) if matches!(t.kind, TxKind::FindAndLock { .. }) && t.is_locked() => {
                self.finish(tx, Reply::OK);
                true
            }
            _ => false,
        }
    }

    /// Sends a read request for `addr` from `requester` to `target`.
    pub fn read_request(&mut self, target: NodeId, requester: NodeId, addr: u64) -> TxId {
        let block = self.block_addr(target, addr);
        let latency = self.message_latency;
        self.spawn(target, TxKind::ReadRequest { requester }, block, Parent::External, latency)
    }

    /// Sends a write request for `addr` from `requester` to `target`.
    pub fn write_request(&mut self, target: NodeId, requester: NodeId, addr: u64) -> TxId {
        let block = self.block_addr(target, addr);
        let latency = self.message_latency;
        self.spawn(target, TxKind::WriteRequest { requester }, block, Parent::External, latency)
    }

    /// Runs every protocol event due this cycle, then advances the clock.
    pub fn advance_one_cycle(&mut self) {
        while let Some(event) = self.events.pop_due() {
            self.handle(event);
        }
        self.events.advance();
    }

    /// Takes the processor accesses finished so far.
    pub fn drain_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    /// Takes the replies to external requests received so far.
    pub fn take_external_replies(&mut self) -> Vec<(TxId, Reply)> {
        std::mem::take(&mut self.external)
    }

    /// Reply received for external request `tx`, if any and not yet taken.
    pub fn external_reply(&self, tx: TxId) -> Option<Reply> {
        self.external.iter().find(|(id, _)| *id == tx).map(|&(_, r)| r)
    }

    /// In-flight transaction `tx`.
    pub fn transaction(&self, tx: TxId) -> Option<&Transaction> {
        self.txs.get(&tx)
    }

    /// Number of in-flight transactions.
    pub fn in_flight(&self) -> usize {
        self.txs.len()
    }

    /// The storage of cache node `node`.
    pub fn cache(&self, node: NodeId) -> Option<&Cache> {
        self.nodes.get(node.0)?.as_cache().map(|c| &c.cache)
    }

    /// State of `addr` in cache `node` (`Invalid` when absent).
    pub fn block_state(&self, node: NodeId, addr: u64) -> MesiState {
        self.cache(node)
            .and_then(|c| c.find(addr).map(|(s, w)| c.block(s, w).state))
            .unwrap_or_default()
    }

    /// Directory entry of `addr` in cache `node`, if the block is present.
    pub fn directory_entry(&self, node: NodeId, addr: u64) -> Option<&DirectoryEntry> {
        let cache = self.cache(node)?;
        let (set, way) = cache.find(addr)?;
        Some(cache.dir(set, way))
    }

    /// Counters of cache `node`.
    pub fn cache_stats(&self, node: NodeId) -> Option<&CacheStats> {
        self.nodes.get(node.0)?.as_cache().map(|c| &c.stats)
    }

    /// Every cache node with its name and counters.
    pub fn caches(&self) -> impl Iterator<Item = (NodeId, &CoherentCache)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_cache().map(|c| (NodeId(i), c)))
    }

    /// Requests served by the memory controller.
    pub fn controller_accesses(&self) -> u64 {
        match self.nodes.get(self.controller.0) {
            Some(Node::Controller(mc)) => mc.accesses,
            _ => 0,
        }
    }

    /// Loads merged into an outstanding load, over all sequencers.
    pub fn coalesced_loads(&self) -> u64 {
        self.nodes
            .iter()
            .map(|n| match n {
                Node::Sequencer(s) => s.coalesced,
                _ => 0,
            })
            .sum()
    }

    /// Blocks whose directory entry breaks the MESI sharing rules.
    ///
    /// # Returns
    ///
    /// `(node, block address)` of every offending block; empty when consistent.
    pub fn directory_violations(&self) -> Vec<(NodeId, u64)> {
        self.caches()
            .flat_map(|(id, c)| {
                c.cache
                    .slots()
                    .filter(|(_, _, b, d)| !d.is_consistent(b.state))
                    .map(move |(_, _, b, _)| (id, b.tag))
            })
            .collect()
    }

    pub(super) fn block_addr(&self, node: NodeId, addr: u64) -> u64 {
        self.cache(node).map_or(addr, |c| c.block_addr(addr))
    }

    /// Creates a transaction and schedules its start after `delay`.
    pub(super) fn spawn(&mut self, node: NodeId, kind: TxKind, addr: u64, parent: Parent, delay: u64) -> TxId {
        let id = TxId(self.next_tx);
        self.next_tx += 1;
        debug!(%id, %node, ?kind, addr, "spawn");
        let _ = self.txs.insert(id, Transaction::new(id, node, kind, addr, parent));
        self.events.schedule(MemEvent::Start(id), delay);
        id
    }

    /// Next value of the xorshift backoff generator.
    pub(super) fn next_random(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }

    /// Randomized lock retry delay in `[hit_latency, 2 * hit_latency + 1]`.
    pub(super) fn retry_latency(&mut self, hit_latency: u64) -> u64 {
        hit_latency + self.next_random() % (hit_latency + 2)
    }
}
