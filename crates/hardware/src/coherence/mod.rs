//! Directory-based MESI coherence.
//!
//! This module models the memory hierarchy below the cores:
//! 1. **Cache:** Set-associative blocks with per-block directory entries and per-set locks.
//! 2. **Nodes:** Sequencers (core ports), coherent caches, and the memory controller.
//! 3. **Transactions:** Protocol operations kept as data and resumed by events.
//! 4. **Protocol:** Lock acquisition, eviction, up-down and down-up requests, invalidation.
//! 5. **System:** Topology construction, the public access API, and the event loop.

/// Blocks, directory entries, and set locks.
pub mod cache;

/// MESI states.
pub mod mesi;

/// Sequencer, cache, and memory controller nodes.
pub mod node;

/// Protocol state machine.
mod protocol;

/// Topology and event loop.
pub mod system;

/// Transaction records and protocol events.
pub mod transaction;

pub use cache::{Cache, CacheBlock, DirectoryEntry, DirectoryLock};
pub use mesi::MesiState;
pub use system::{Completion, CorePorts, MemorySystem};
pub use transaction::{AccessTag, Phase, Reply, Transaction, TxId, TxKind};
