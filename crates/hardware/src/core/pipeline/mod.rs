//! Out-of-order pipeline structures.
//!
//! This module contains the in-flight state of the pipeline and its stages:
//! 1. **Entries:** Decode buffer, reorder buffer, and load/store queue records.
//! 2. **Buffers:** The ROB and LSQ rings and the queues between stages.
//! 3. **Registers:** Physical register files and the rename table.
//! 4. **Stages:** Fetch, rename, dispatch, issue, writeback, and commit.

/// In-flight instruction records and handles.
pub mod entry;

/// Load/store queue: disambiguation and forwarding.
pub mod lsq;

/// Decode buffer and the ready, waiting, and completion queues.
pub mod queues;

/// Physical register files and the rename table.
pub mod regfile;

/// Reorder buffer ring.
pub mod rob;

/// Pipeline stage implementations.
pub mod stages;

pub use entry::{DecodeBufferEntry, EntryKind, EntryRef, EntryStatus, LsqEntry, RobEntry, Sequenced};
pub use lsq::{ForwardResult, LoadStoreQueue};
pub use queues::{DecodeBuffer, OooEventQueue, ReadyQueue, WaitingQueue};
pub use regfile::{PhysReg, PhysRegState, PhysicalRegisterFile, RegisterFiles, RegisterRenameTable, Rename};
pub use rob::{InFlightBuffer, ReorderBuffer};
