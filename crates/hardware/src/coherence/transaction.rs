//! In-flight coherence transactions.
//!
//! Each protocol operation is a `Transaction` record kept by the memory system,
//! and its continuation points are `MemEvent`s in the system's event queue.
//! A transaction that spawns sub-requests waits on a join counter (`pending`)
//! and accumulates their replies before resuming.

use std::fmt;

use crate::common::NodeId;

use super::mesi::MesiState;

/// Identifier of a transaction; never reused within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// Tag a core attaches to a memory access to recognize its completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessTag(pub u64);

/// Outcome of a transaction as seen by its requester.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    /// The request could not be served; the requester retries or fails.
    pub has_error: bool,
    /// The supplier keeps a copy, so the requester may not take the block exclusive.
    pub is_shared: bool,
}

impl Reply {
    /// Successful reply.
    pub const OK: Self = Self {
        has_error: false,
        is_shared: false,
    };

    /// Failed reply.
    pub const ERROR: Self = Self {
        has_error: true,
        is_shared: false,
    };
}

/// What a transaction does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxKind {
    /// Processor load arriving from a sequencer.
    Load,
    /// Processor store arriving from a sequencer.
    Store,
    /// Read permission requested by `requester`.
    ReadRequest {
        /// Node asking for the block.
        requester: NodeId,
    },
    /// Write permission requested by `requester`.
    WriteRequest {
        /// Node asking for the block.
        requester: NodeId,
    },
    /// Removes the block in `(set, way)` to make room, under the parent's lock.
    Evict {
        /// Set of the victim.
        set: usize,
        /// Way of the victim.
        way: usize,
    },
    /// Notification from `requester` that it dropped its copy.
    EvictReceive {
        /// Evicting node.
        requester: NodeId,
        /// The dropped copy was dirty.
        writeback: bool,
    },
    /// Invalidates every sharer of `(set, way)` except `except`, under the parent's lock.
    Invalidate {
        /// Sharer left untouched.
        except: Option<NodeId>,
        /// Set of the block.
        set: usize,
        /// Way of the block.
        way: usize,
    },
    /// Bare lookup-and-lock; holds the lock until released by the caller.
    FindAndLock {
        /// Report an error instead of retrying when the set is locked.
        is_blocking: bool,
        /// Counted as a read rather than a write.
        is_read: bool,
    },
}

/// Why a child transaction was spawned; tells the parent how to use its reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Request forwarded to the next level.
    Next,
    /// Down-up read that demotes the current owner.
    Demote(NodeId),
    /// Invalidation of the block's sharers.
    Invalidate,
    /// Down-up write sent to one sharer by an invalidation.
    Sharer(NodeId),
    /// Eviction of the victim chosen by a lock acquisition.
    Evict,
}

/// Who receives a transaction's reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    /// A processor access issued through a sequencer.
    Access {
        /// Issuing sequencer.
        sequencer: NodeId,
        /// Block address.
        block: u64,
        /// Tag of a store; loads are matched by block.
        store: Option<AccessTag>,
    },
    /// Another transaction.
    Tx {
        /// Waiting transaction.
        id: TxId,
        /// Meaning of this child for the parent.
        role: Role,
    },
    /// A caller outside the hierarchy; replies are collected by the memory system.
    External,
}

/// Progress of a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Waiting to acquire the set lock.
    #[default]
    Locking,
    /// Lock held; evicting the victim.
    Evicting,
    /// Lock held; lookup latency elapsing.
    Locked,
    /// Waiting on child transactions.
    Waiting,
    /// Lock held by a bare `FindAndLock` until released.
    Held,
}

/// Slot selected by a lock acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockedBlock {
    /// Set index.
    pub set: usize,
    /// Selected way; `None` for a non-allocating miss.
    pub way: Option<usize>,
    /// Block address.
    pub tag: u64,
    /// State of the block when the lock was taken.
    pub state: MesiState,
}

/// One in-flight protocol operation.
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Identifier.
    pub id: TxId,
    /// Node performing the operation.
    pub node: NodeId,
    /// Operation.
    pub kind: TxKind,
    /// Block address.
    pub addr: u64,
    /// Reply destination.
    pub parent: Parent,
    /// Set after the first failed lock attempt; suppresses access statistics.
    pub is_retry: bool,
    /// Progress.
    pub phase: Phase,
    /// Slot selected once the lock is held.
    pub locked: Option<LockedBlock>,
    /// The lock was already held by an ancestor; do not release it.
    pub reentrant: bool,
    /// Outstanding children.
    pub pending: usize,
    /// Replies accumulated from children.
    pub reply: Reply,
    /// Nodes that acknowledged an invalidation.
    pub invalidated: Vec<NodeId>,
    /// A demoted owner no longer held the block.
    pub owner_dropped: bool,
}

impl Transaction {
    /// Creates a transaction that has not started yet.
    pub fn new(id: TxId, node: NodeId, kind: TxKind, addr: u64, parent: Parent) -> Self {
        Self {
            id,
            node,
            kind,
            addr,
            parent,
            is_retry: false,
            phase: Phase::Locking,
            locked: None,
            reentrant: false,
            pending: 0,
            reply: Reply::OK,
            invalidated: Vec::new(),
            owner_dropped: false,
        }
    }

    /// The transaction currently owns its set lock.
    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    /// Records one child reply; returns true when every child has answered.
    pub fn join(&mut self, reply: Reply) -> bool {
        self.reply.has_error |= reply.has_error;
        self.reply.is_shared |= reply.is_shared;
        self.pending = self.pending.saturating_sub(1);
        self.pending == 0
    }
}

/// Continuation points of the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemEvent {
    /// Begin (or retry) a transaction.
    Start(TxId),
    /// Lock held and lookup latency elapsed; run the operation body.
    Locked(TxId),
    /// A child finished.
    Reply {
        /// Parent receiving the reply.
        tx: TxId,
        /// The child's outcome.
        reply: Reply,
        /// Meaning of the child.
        role: Role,
    },
}
