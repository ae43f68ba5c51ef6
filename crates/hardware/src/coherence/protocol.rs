//! MESI directory protocol engine.
//!
//! Every transaction runs through the same skeleton:
//! 1. **Start:** Lock-taking kinds look the block up and try the set lock
//!    (`lock_lookup`); `Evict` and `Invalidate` run under their parent's lock.
//! 2. **Evict:** An allocating miss whose victim is valid evicts it before going on.
//! 3. **Locked:** After the lookup latency, the kind-specific body runs and may
//!    send requests to other nodes.
//! 4. **Reply:** Children answer through the parent's join counter; when it
//!    drains the parent continues or finishes.
//!
//! Requests cost `message_latency` on the way out; replies are delivered in the
//! same cycle they are produced.
//!
//! # Lock modes
//!
//! | kind                | blocking | allocates |
//! |---------------------|----------|-----------|
//! | Load, Store         | no       | yes       |
//! | up-down Read/Write  | no       | yes       |
//! | down-up Read/Write  | yes      | no        |
//! | EvictReceive        | no       | no        |
//!
//! A blocking lookup that finds its set locked fails at once; the error travels
//! back until a non-blocking transaction retries after a randomized backoff. A
//! lock already held by an ancestor of the transaction is re-entered instead, so
//! an eviction that invalidates a block in the requester's own locked set does
//! not deadlock.
//!
//! A down-up request may also run under a lock held by a processor `Load` or
//! `Store` of the same block that is parked on its next-level request. Such an
//! access has not been granted the block yet, and refusing the request would
//! make two writers of one block fail each other's invalidations forever.

use tracing::{debug, trace};

use crate::common::NodeId;
use crate::stats::CacheStats;

use super::cache::{CacheBlock, DirectoryEntry};
use super::mesi::MesiState;
use super::node::Node;
use super::system::{Completion, MemorySystem};
use super::transaction::{LockedBlock, MemEvent, Parent, Phase, Reply, Role, TxId, TxKind};

impl MemorySystem {
    pub(super) fn handle(&mut self, event: MemEvent) {
        match event {
            MemEvent::Start(id) => self.start(id),
            MemEvent::Locked(id) => self.locked(id),
            MemEvent::Reply { tx, reply, role } => self.on_reply(tx, reply, role),
        }
    }

    fn start(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind) = (tx.node, tx.kind);
        let controller_latency = match &self.nodes[node.0] {
            Node::Controller(mc) => Some(mc.latency),
            _ => None,
        };
        if let Some(latency) = controller_latency {
            self.set_phase(id, Phase::Locked);
            self.events.schedule(MemEvent::Locked(id), latency);
            return;
        }
        if self.nodes[node.0].as_cache().is_none() {
            self.finish(id, Reply::ERROR);
            return;
        }
        match kind {
            TxKind::Evict { .. } => self.evict(id),
            TxKind::Invalidate { .. } => self.invalidate(id),
            _ => self.lock_lookup(id),
        }
    }

    /// `(is_blocking, allocates)` of a lock-taking transaction.
    fn lock_mode(&self, kind: TxKind, node: NodeId) -> (bool, bool) {
        match kind {
            TxKind::Load | TxKind::Store => (false, true),
            TxKind::ReadRequest { requester } | TxKind::WriteRequest { requester } => {
                if self.next_of(requester) == Some(node) {
                    (false, true)
                } else {
                    (true, false)
                }
            }
            TxKind::FindAndLock { is_blocking, .. } => (is_blocking, true),
            TxKind::EvictReceive { .. } | TxKind::Evict { .. } | TxKind::Invalidate { .. } => {
                (false, false)
            }
        }
    }

    /// The request travels from a child toward memory.
    fn is_up_down(&self, kind: TxKind, node: NodeId) -> bool {
        match kind {
            TxKind::ReadRequest { requester } | TxKind::WriteRequest { requester } => {
                self.next_of(requester) == Some(node)
            }
            _ => false,
        }
    }

    fn is_ancestor(&self, holder: TxId, id: TxId) -> bool {
        let mut parent = self.txs.get(&id).map(|t| t.parent);
        while let Some(Parent::Tx { id: p, .. }) = parent {
            if p == holder {
                return true;
            }
            parent = self.txs.get(&p).map(|t| t.parent);
        }
        false
    }

    /// `holder` is a processor access of `addr` waiting on the next level.
    fn is_parked_access(&self, holder: TxId, addr: u64) -> bool {
        self.txs.get(&holder).is_some_and(|h| {
            matches!(h.kind, TxKind::Load | TxKind::Store)
                && h.phase == Phase::Waiting
                && h.addr == addr
        })
    }

    fn hit_latency(&self, node: NodeId) -> u64 {
        self.nodes[node.0].as_cache().map_or(0, |c| c.hit_latency)
    }

    fn lock_lookup(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind, addr, is_retry) = (tx.node, tx.kind, tx.addr, tx.is_retry);
        let (is_blocking, allocates) = self.lock_mode(kind, node);
        let is_read = match kind {
            TxKind::Load | TxKind::ReadRequest { .. } => Some(true),
            TxKind::Store | TxKind::WriteRequest { .. } => Some(false),
            TxKind::FindAndLock { is_read, .. } => Some(is_read),
            _ => None,
        };
        let cycle = self.events.cycle();
        let random = self.next_random();
        let Some(cc) = self.nodes[node.0].as_cache() else {
            return;
        };
        let set = cc.cache.set_index(addr);
        let holder = cc.cache.lock(set).holder;
        let hit_latency = cc.hit_latency;
        let held_by_other = holder.is_some_and(|h| h != id);
        let down_up = matches!(kind, TxKind::ReadRequest { .. } | TxKind::WriteRequest { .. })
            && !self.is_up_down(kind, node);
        let reentrant = holder.is_some_and(|h| {
            self.is_ancestor(h, id) || (down_up && h != id && self.is_parked_access(h, addr))
        });
        let lookup = cc.cache.lookup(addr, held_by_other);

        if let Some(cc) = self.nodes[node.0].as_cache_mut() {
            if !is_retry {
                cc.stats.accesses += 1;
                if lookup.hit {
                    cc.stats.hits += 1;
                }
                match is_read {
                    Some(true) => cc.stats.reads += 1,
                    Some(false) => cc.stats.writes += 1,
                    None => {}
                }
            }
        }

        if held_by_other && !reentrant {
            trace!(%id, %node, set, ?holder, "set locked");
            self.lock_failed(id, is_blocking, hit_latency);
            return;
        }

        let Some(cc) = self.nodes[node.0].as_cache_mut() else {
            return;
        };
        let way = if lookup.hit {
            lookup.way
        } else if allocates {
            Some(cc.cache.victim(set, random))
        } else {
            None
        };
        let mut victim = None;
        let state = match way {
            Some(w) => {
                let block = cc.cache.block_mut(set, w);
                block.last_access = cycle;
                if lookup.hit {
                    block.state
                } else {
                    if block.state.is_valid() {
                        victim = Some((w, block.tag));
                    }
                    block.transient_tag = Some(addr);
                    MesiState::Invalid
                }
            }
            None => MesiState::Invalid,
        };
        if !reentrant {
            cc.cache.set_lock(set, Some(id));
        }
        if let Some(tx) = self.txs.get_mut(&id) {
            tx.locked = Some(LockedBlock {
                set,
                way,
                tag: addr,
                state,
            });
            tx.reentrant = reentrant;
        }
        debug!(%id, %node, set, ?way, ?state, hit = lookup.hit, reentrant, "locked");

        if let Some((w, tag)) = victim {
            self.set_phase(id, Phase::Evicting);
            self.spawn_child(id, node, TxKind::Evict { set, way: w }, tag, Role::Evict, 0);
        } else {
            self.set_phase(id, Phase::Locked);
            self.events.schedule(MemEvent::Locked(id), hit_latency);
        }
    }

    fn lock_failed(&mut self, id: TxId, is_blocking: bool, hit_latency: u64) {
        if is_blocking {
            self.finish(id, Reply::ERROR);
            return;
        }
        let delay = self.retry_latency(hit_latency);
        if let Some(tx) = self.txs.get_mut(&id) {
            tx.is_retry = true;
            tx.phase = Phase::Locking;
        }
        self.events.schedule(MemEvent::Start(id), delay);
    }

    /// Drops the lock and transient tag held by `id`, keeping the transaction alive.
    ///
    /// A borrowed lock (ancestor or parked access) stays with its holder.
    fn unlock(&mut self, id: TxId) {
        let Some(tx) = self.txs.get_mut(&id) else {
            return;
        };
        let Some(locked) = tx.locked.take() else {
            return;
        };
        if std::mem::take(&mut tx.reentrant) {
            return;
        }
        let (node, addr) = (tx.node, tx.addr);
        let Some(cc) = self.nodes[node.0].as_cache_mut() else {
            return;
        };
        if let Some(w) = locked.way {
            let block = cc.cache.block_mut(locked.set, w);
            if block.transient_tag == Some(addr) {
                block.transient_tag = None;
            }
        }
        debug_assert_eq!(cc.cache.lock(locked.set).holder, Some(id));
        cc.cache.set_lock(locked.set, None);
    }

    fn set_phase(&mut self, id: TxId, phase: Phase) {
        if let Some(tx) = self.txs.get_mut(&id) {
            tx.phase = phase;
        }
    }

    /// Creates a child of `parent` at `node` and counts it in the parent's join.
    fn spawn_child(&mut self, parent: TxId, node: NodeId, kind: TxKind, addr: u64, role: Role, delay: u64) {
        if let Some(tx) = self.txs.get_mut(&parent) {
            tx.pending += 1;
        }
        let _ = self.spawn(node, kind, addr, Parent::Tx { id: parent, role }, delay);
    }

    /// Sends a request from `parent`'s node to `target`.
    fn send(&mut self, parent: TxId, target: NodeId, kind: TxKind, role: Role) {
        let Some(tx) = self.txs.get_mut(&parent) else {
            return;
        };
        tx.phase = Phase::Waiting;
        let addr = tx.addr;
        let latency = self.message_latency;
        self.spawn_child(parent, target, kind, addr, role, latency);
    }

    /// Sends `kind` to the next level of `id`'s node, or fails if there is none.
    fn send_next(&mut self, id: TxId, kind: TxKind) {
        let Some(node) = self.txs.get(&id).map(|t| t.node) else {
            return;
        };
        match self.next_of(node) {
            Some(next) => self.send(id, next, kind, Role::Next),
            None => self.finish(id, Reply::ERROR),
        }
    }

    fn locked(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind, locked) = (tx.node, tx.kind, tx.locked);
        if let Node::Controller(mc) = &mut self.nodes[node.0] {
            mc.accesses += 1;
            self.finish(id, Reply::OK);
            return;
        }
        let Some(state) = locked.map(|l| l.state) else {
            return;
        };
        match kind {
            TxKind::Load => {
                if state.is_read_hit() {
                    self.finish(id, Reply::OK);
                } else {
                    self.send_next(id, TxKind::ReadRequest { requester: node });
                }
            }
            TxKind::Store => {
                if state.is_write_hit() {
                    self.set_state(id, MesiState::Modified);
                    self.finish(id, Reply::OK);
                } else {
                    self.send_next(id, TxKind::WriteRequest { requester: node });
                }
            }
            TxKind::ReadRequest { .. } => {
                if self.is_up_down(kind, node) {
                    if state.is_valid() {
                        self.read_demote_owner(id);
                    } else {
                        self.send_next(id, TxKind::ReadRequest { requester: node });
                    }
                } else if state.is_valid() {
                    self.read_demote_owner(id);
                } else {
                    self.finish(id, Reply::OK);
                }
            }
            TxKind::WriteRequest { requester } => {
                if self.is_up_down(kind, node) {
                    self.write_up_down(id, requester, state);
                } else if state.is_valid() {
                    self.invalidate_sharers(id, None);
                } else {
                    self.finish(id, Reply::OK);
                }
            }
            TxKind::EvictReceive { requester, writeback } => {
                if state.is_valid() {
                    self.with_block(id, |block, dir| {
                        dir.remove(requester);
                        if writeback && dir.sharers.is_empty() {
                            block.state = MesiState::Modified;
                        }
                    });
                }
                self.finish(id, Reply::OK);
            }
            TxKind::FindAndLock { .. } => {
                self.set_phase(id, Phase::Held);
                self.external.push((id, Reply::OK));
            }
            TxKind::Evict { .. } | TxKind::Invalidate { .. } => {}
        }
    }

    /// Applies `f` to the block and directory entry locked by `id`.
    fn with_block(
        &mut self,
        id: TxId,
        f: impl FnOnce(&mut CacheBlock, &mut DirectoryEntry),
    ) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, locked) = (tx.node, tx.locked);
        let Some(LockedBlock { set, way: Some(way), .. }) = locked else {
            return;
        };
        let Some(cc) = self.nodes[node.0].as_cache_mut() else {
            return;
        };
        let mut block = *cc.cache.block(set, way);
        f(&mut block, cc.cache.dir_mut(set, way));
        *cc.cache.block_mut(set, way) = block;
    }

    /// Installs the locked block with `state`.
    fn set_state(&mut self, id: TxId, state: MesiState) {
        let Some(tag) = self.txs.get(&id).map(|t| t.addr) else {
            return;
        };
        self.with_block(id, |block, _| {
            block.tag = tag;
            block.state = state;
        });
        if let Some(l) = self.txs.get_mut(&id).and_then(|t| t.locked.as_mut()) {
            l.state = state;
        }
    }

    fn stats_of(&mut self, id: TxId) -> Option<&mut CacheStats> {
        let node = self.txs.get(&id)?.node;
        self.nodes[node.0].as_cache_mut().map(|c| &mut c.stats)
    }

    /// Sends a down-up read to the block's owner, if one other than the requester exists.
    fn read_demote_owner(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind, locked) = (tx.node, tx.kind, tx.locked);
        let TxKind::ReadRequest { requester } = kind else {
            return;
        };
        let owner = locked.and_then(|l| {
            let way = l.way?;
            self.nodes[node.0].as_cache()?.cache.dir(l.set, way).owner
        });
        match owner {
            Some(o) if o != requester => {
                self.send(id, o, TxKind::ReadRequest { requester: node }, Role::Demote(o));
            }
            _ => self.read_finish(id),
        }
    }

    /// Final step of a read once the owner (if any) has been demoted.
    fn read_finish(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind) = (tx.node, tx.kind);
        let TxKind::ReadRequest { requester } = kind else {
            return;
        };
        if self.is_up_down(kind, node) {
            let mut shared = true;
            let mut cleaned = false;
            self.with_block(id, |block, dir| {
                let _ = dir.sharers.insert(requester);
                let exclusive = dir.sharers.len() == 1
                    && matches!(block.state, MesiState::Exclusive | MesiState::Modified);
                if exclusive {
                    dir.owner = Some(requester);
                    shared = false;
                } else {
                    dir.owner = None;
                    if block.state == MesiState::Modified {
                        block.state = MesiState::Exclusive;
                        cleaned = true;
                    }
                }
            });
            if cleaned {
                if let Some(stats) = self.stats_of(id) {
                    stats.writebacks += 1;
                }
            }
            self.finish(
                id,
                Reply {
                    has_error: false,
                    is_shared: shared,
                },
            );
        } else {
            let mut dirty = false;
            self.with_block(id, |block, dir| {
                dirty = block.state == MesiState::Modified;
                block.state = MesiState::Shared;
                dir.owner = None;
            });
            if dirty {
                if let Some(stats) = self.stats_of(id) {
                    stats.writebacks += 1;
                }
            }
            self.finish(
                id,
                Reply {
                    has_error: false,
                    is_shared: true,
                },
            );
        }
    }

    fn write_up_down(&mut self, id: TxId, requester: NodeId, state: MesiState) {
        let node = match self.txs.get(&id) {
            Some(tx) => tx.node,
            None => return,
        };
        if let Some(tx) = self.txs.get_mut(&id) {
            tx.phase = Phase::Waiting;
        }
        let mut children = false;
        if state.is_valid() {
            self.spawn_invalidate(id, Some(requester));
            children = true;
        }
        if !state.is_write_hit() {
            self.send_next(id, TxKind::WriteRequest { requester: node });
            children = true;
        }
        if !children {
            self.write_up_down_finish(id);
        }
    }

    fn write_up_down_finish(&mut self, id: TxId) {
        let Some((addr, kind)) = self.txs.get(&id).map(|t| (t.addr, t.kind)) else {
            return;
        };
        let TxKind::WriteRequest { requester } = kind else {
            return;
        };
        self.with_block(id, |block, dir| {
            block.tag = addr;
            block.state = MesiState::Modified;
            dir.clear();
            let _ = dir.sharers.insert(requester);
            dir.owner = Some(requester);
        });
        self.finish(id, Reply::OK);
    }

    /// Invalidates the sharers of the locked block except `except`.
    fn invalidate_sharers(&mut self, id: TxId, except: Option<NodeId>) {
        self.set_phase(id, Phase::Waiting);
        self.spawn_invalidate(id, except);
    }

    fn spawn_invalidate(&mut self, id: TxId, except: Option<NodeId>) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, addr, locked) = (tx.node, tx.addr, tx.locked);
        let Some(LockedBlock { set, way: Some(way), .. }) = locked else {
            return;
        };
        self.spawn_child(id, node, TxKind::Invalidate { except, set, way }, addr, Role::Invalidate, 0);
    }

    /// Body of an `Invalidate`: down-up writes to every sharer but `except`.
    fn invalidate(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind) = (tx.node, tx.kind);
        let TxKind::Invalidate { except, set, way } = kind else {
            return;
        };
        let targets: Vec<NodeId> = self.nodes[node.0]
            .as_cache()
            .map(|c| {
                c.cache
                    .dir(set, way)
                    .sharers
                    .iter()
                    .copied()
                    .filter(|&s| Some(s) != except)
                    .collect()
            })
            .unwrap_or_default();
        if targets.is_empty() {
            self.finish(id, Reply::OK);
            return;
        }
        self.set_phase(id, Phase::Waiting);
        for target in targets {
            self.send(id, target, TxKind::WriteRequest { requester: node }, Role::Sharer(target));
        }
    }

    /// Body of an `Evict`: invalidate upper copies, then notify the next level.
    fn evict(&mut self, id: TxId) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, addr, kind) = (tx.node, tx.addr, tx.kind);
        let TxKind::Evict { set, way } = kind else {
            return;
        };
        self.set_phase(id, Phase::Waiting);
        self.spawn_child(id, node, TxKind::Invalidate { except: None, set, way }, addr, Role::Invalidate, 0);
    }

    fn on_reply(&mut self, id: TxId, reply: Reply, role: Role) {
        let Some(tx) = self.txs.get_mut(&id) else {
            return;
        };
        trace!(%id, ?role, ?reply, "reply");
        if let Role::Sharer(target) = role {
            if !reply.has_error {
                tx.invalidated.push(target);
            }
        }
        if let Role::Demote(_) = role {
            tx.owner_dropped = !reply.has_error && !reply.is_shared;
        }
        if !tx.join(reply) {
            return;
        }
        let acc = std::mem::take(&mut tx.reply);
        let (node, kind) = (tx.node, tx.kind);

        match (kind, role) {
            (_, Role::Evict) => self.evicted(id, acc),
            (TxKind::Load | TxKind::Store, _) => self.filled(id, kind, acc),
            (TxKind::ReadRequest { .. }, Role::Next) => {
                if acc.has_error {
                    self.finish(id, Reply::ERROR);
                } else {
                    let state = if acc.is_shared {
                        MesiState::Shared
                    } else {
                        MesiState::Exclusive
                    };
                    self.set_state(id, state);
                    self.read_demote_owner(id);
                }
            }
            (TxKind::ReadRequest { .. }, Role::Demote(owner)) => {
                if acc.has_error {
                    self.finish(id, Reply::ERROR);
                    return;
                }
                let dropped = self.txs.get(&id).is_some_and(|t| t.owner_dropped);
                self.with_block(id, |_, dir| {
                    dir.owner = None;
                    if dropped {
                        dir.remove(owner);
                    }
                });
                self.read_finish(id);
            }
            (TxKind::WriteRequest { .. }, _) => {
                if acc.has_error {
                    self.finish(id, Reply::ERROR);
                } else if self.is_up_down(kind, node) {
                    self.write_up_down_finish(id);
                } else {
                    let mut dirty = false;
                    self.with_block(id, |block, dir| {
                        dirty = block.state == MesiState::Modified;
                        block.state = MesiState::Invalid;
                        dir.clear();
                    });
                    if let Some(stats) = self.stats_of(id) {
                        stats.invalidations += 1;
                        if dirty {
                            stats.writebacks += 1;
                        }
                    }
                    self.finish(id, Reply::OK);
                }
            }
            (TxKind::Invalidate { set, way, .. }, _) => {
                let done = self
                    .txs
                    .get_mut(&id)
                    .map(|t| std::mem::take(&mut t.invalidated))
                    .unwrap_or_default();
                if let Some(cc) = self.nodes[node.0].as_cache_mut() {
                    let dir = cc.cache.dir_mut(set, way);
                    for n in done {
                        dir.remove(n);
                    }
                }
                self.finish(
                    id,
                    Reply {
                        has_error: acc.has_error,
                        is_shared: false,
                    },
                );
            }
            (TxKind::Evict { set, way }, Role::Invalidate) => {
                if acc.has_error {
                    self.finish(id, Reply::ERROR);
                    return;
                }
                let writeback = self.nodes[node.0]
                    .as_cache()
                    .is_some_and(|c| c.cache.block(set, way).state == MesiState::Modified);
                self.send_next(id, TxKind::EvictReceive { requester: node, writeback });
            }
            (TxKind::Evict { set, way }, _) => {
                if let Some(cc) = self.nodes[node.0].as_cache_mut() {
                    cc.cache.block_mut(set, way).state = MesiState::Invalid;
                    cc.cache.dir_mut(set, way).clear();
                    cc.stats.evictions += 1;
                }
                self.finish(id, acc);
            }
            // Reads never spawn invalidations; anything else just passes the reply on.
            (
                TxKind::ReadRequest { .. } | TxKind::EvictReceive { .. } | TxKind::FindAndLock { .. },
                _,
            ) => self.finish(id, acc),
        }
    }

    /// Continues a lock acquisition after its victim eviction.
    fn evicted(&mut self, id: TxId, acc: Reply) {
        let Some(tx) = self.txs.get(&id) else {
            return;
        };
        let (node, kind) = (tx.node, tx.kind);
        let hit_latency = self.hit_latency(node);
        if acc.has_error {
            let (is_blocking, _) = self.lock_mode(kind, node);
            self.unlock(id);
            self.lock_failed(id, is_blocking, hit_latency);
        } else {
            self.set_phase(id, Phase::Locked);
            self.events.schedule(MemEvent::Locked(id), hit_latency);
        }
    }

    /// Completes a processor load or store once the next level answered.
    fn filled(&mut self, id: TxId, kind: TxKind, acc: Reply) {
        let Some(node) = self.txs.get(&id).map(|t| t.node) else {
            return;
        };
        if acc.has_error {
            if let Some(stats) = self.stats_of(id) {
                if kind == TxKind::Load {
                    stats.read_retries += 1;
                } else {
                    stats.write_retries += 1;
                }
            }
            self.unlock(id);
            let hit_latency = self.hit_latency(node);
            self.lock_failed(id, false, hit_latency);
            return;
        }
        let state = match (kind, acc.is_shared) {
            (TxKind::Store, _) => MesiState::Modified,
            (_, true) => MesiState::Shared,
            (_, false) => MesiState::Exclusive,
        };
        self.set_state(id, state);
        self.finish(id, Reply::OK);
    }

    /// Retires `id`: releases its lock and hands `reply` to its parent.
    pub(super) fn finish(&mut self, id: TxId, reply: Reply) {
        self.unlock(id);
        let Some(tx) = self.txs.remove(&id) else {
            return;
        };
        debug!(%id, node = %tx.node, ?reply, "finish");
        match tx.parent {
            Parent::Tx { id: parent, role } => {
                self.events.schedule(MemEvent::Reply { tx: parent, reply, role }, 0);
            }
            Parent::Access {
                sequencer,
                block,
                store,
            } => {
                let Some(Node::Sequencer(seq)) = self.nodes.get_mut(sequencer.0) else {
                    return;
                };
                let core = seq.core;
                let tags = match store {
                    Some(tag) => vec![tag],
                    None => seq.pending_loads.remove(&block).unwrap_or_default(),
                };
                self.completions
                    .extend(tags.into_iter().map(|tag| Completion { core, tag }));
            }
            Parent::External => self.external.push((id, reply)),
        }
    }
}
