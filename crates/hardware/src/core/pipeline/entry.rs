//! In-flight instruction records.
//!
//! An instruction moves through three records:
//! 1. **`DecodeBufferEntry`:** Created at fetch with the predicted and actual next PC.
//! 2. **`RobEntry`:** Created at rename; tracks renamed registers and issue status.
//! 3. **`LsqEntry`:** Created at rename alongside the ROB entry of a load or store.
//!
//! Queues outside the ROB/LSQ refer to entries by `EntryRef`. A squashed entry is
//! removed from its buffer, so a stale `EntryRef` simply fails to resolve and is
//! dropped by whichever stage dequeues it.

use crate::core::units::bru::PredictionRecord;
use crate::isa::DynamicInstruction;

use super::regfile::{PhysReg, Rename};

/// Which buffer an `EntryRef` points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// The reorder buffer.
    Rob,
    /// The load/store queue.
    Lsq,
}

/// Stable handle to an in-flight entry.
///
/// Sequence numbers are never reused within a thread, so a handle to a squashed
/// entry cannot alias a newer one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryRef {
    /// Thread index within the core.
    pub thread: usize,
    /// Program-order sequence number (shared by an instruction's ROB and LSQ entries).
    pub seq: u64,
    /// Target buffer.
    pub kind: EntryKind,
}

/// Progress flags of an entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryStatus {
    /// Placed in the ready or waiting queue (or handed to disambiguation).
    pub dispatched: bool,
    /// Currently sitting in the ready queue.
    pub in_ready_queue: bool,
    /// Selected for execution.
    pub issued: bool,
    /// Result written back.
    pub completed: bool,
}

/// Anything kept in a sequence-ordered in-flight buffer.
pub trait Sequenced {
    /// Program-order sequence number.
    fn seq(&self) -> u64;
}

/// A fetched instruction waiting for rename.
#[derive(Clone, Debug)]
pub struct DecodeBufferEntry {
    /// Program-order sequence number.
    pub seq: u64,
    /// The instruction with its actual next PC.
    pub inst: DynamicInstruction,
    /// Next PC chosen by the predictor.
    pub pred_npc: u64,
    /// Predictor state for update and recovery.
    pub prediction: Option<PredictionRecord>,
    /// Fetched on a mispredicted path.
    pub speculative: bool,
    /// Translated effective address of a memory operation.
    pub paddr: Option<u64>,
}

/// Reorder buffer entry.
///
/// For memory operations this entry only computes the effective address; the
/// data side lives in the paired `LsqEntry`.
#[derive(Clone, Debug)]
pub struct RobEntry {
    /// Program-order sequence number.
    pub seq: u64,
    /// The instruction.
    pub inst: DynamicInstruction,
    /// Next PC chosen by the predictor.
    pub pred_npc: u64,
    /// Predictor state for update and recovery.
    pub prediction: Option<PredictionRecord>,
    /// Fetched on a mispredicted path.
    pub speculative: bool,
    /// Physical registers read.
    pub sources: Vec<PhysReg>,
    /// Destinations with their previous mapping.
    pub outputs: Vec<Rename>,
    /// Progress flags.
    pub status: EntryStatus,
    /// A paired LSQ entry with the same `seq` exists.
    pub has_lsq: bool,
}

impl RobEntry {
    /// The predicted next PC differs from the executed one.
    pub const fn mispredicted(&self) -> bool {
        self.pred_npc != self.inst.next_pc
    }
}

impl Sequenced for RobEntry {
    fn seq(&self) -> u64 {
        self.seq
    }
}

/// Load/store queue entry.
#[derive(Clone, Debug)]
pub struct LsqEntry {
    /// Sequence number of the owning ROB entry.
    pub seq: u64,
    /// True for stores, false for loads.
    pub is_store: bool,
    /// Virtual effective address.
    pub vaddr: u64,
    /// Physical effective address.
    pub paddr: u64,
    /// Store data registers.
    pub sources: Vec<PhysReg>,
    /// Load destinations with their previous mapping.
    pub outputs: Vec<Rename>,
    /// Progress flags.
    pub status: EntryStatus,
    /// The paired ROB entry has produced the effective address.
    pub ea_ready: bool,
    /// Fetched on a mispredicted path.
    pub speculative: bool,
}

impl Sequenced for LsqEntry {
    fn seq(&self) -> u64 {
        self.seq
    }
}
