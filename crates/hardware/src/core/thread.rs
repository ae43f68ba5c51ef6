//! Hardware thread.
//!
//! A `Thread` owns everything private to one hardware context: architectural
//! state, branch predictor, decode buffer, ROB, LSQ, physical register files,
//! and rename table, plus the fetch and speculation state the stages update.

use crate::common::{RegClass, SimResult};
use crate::config::Config;
use crate::core::pipeline::{
    DecodeBuffer, EntryKind, EntryRef, LoadStoreQueue, RegisterFiles, RegisterRenameTable,
    ReorderBuffer,
};
use crate::core::units::bru::BranchPredictor;
use crate::isa::{ArchState, InstructionSet};
use crate::stats::ThreadStats;

/// One hardware thread of a core.
#[derive(Debug, Clone)]
pub struct Thread {
    /// Index within the core.
    pub id: usize,
    /// Address space (index of the guest memory image and MMU key).
    pub asid: u32,
    /// Committed-path architectural state, updated at fetch.
    pub state: ArchState,
    /// Branch predictor.
    pub predictor: BranchPredictor,
    /// Fetched instructions awaiting rename.
    pub decode_buffer: DecodeBuffer,
    /// Reorder buffer.
    pub rob: ReorderBuffer,
    /// Load/store queue.
    pub lsq: LoadStoreQueue,
    /// Physical register files.
    pub regs: RegisterFiles,
    /// Architectural-to-physical mapping.
    pub rename_table: RegisterRenameTable,
    /// Next address to fetch.
    pub fetch_pc: u64,
    /// Cache line currently available to fetch.
    pub fetch_block: Option<u64>,
    /// An instruction cache access is outstanding.
    pub fetch_pending: bool,
    /// A halt was fetched on the correct path.
    pub fetch_halted: bool,
    /// Fetch is on a mispredicted path.
    pub speculative: bool,
    /// Wrong-path fetch cannot continue until recovery.
    pub wrong_path_stalled: bool,
    /// Sequence number of the next fetched instruction.
    pub next_seq: u64,
    /// The thread has committed its halt, or never had a program.
    pub finished: bool,
    /// Consecutive cycles without a commit.
    pub idle_cycles: u64,
    /// Counters.
    pub stats: ThreadStats,
}

impl Thread {
    /// Creates an idle thread.
    ///
    /// # Arguments
    ///
    /// * `id` - Index within the core.
    /// * `asid` - Initial address space.
    /// * `config` - Processor and predictor parameters.
    /// * `isa` - Supplies the architectural register counts.
    pub fn new(id: usize, asid: u32, config: &Config, isa: &dyn InstructionSet) -> SimResult<Self> {
        let p = &config.processor;
        let mut regs = RegisterFiles::new([p.phys_int_regs, p.phys_fp_regs, p.phys_misc_regs]);
        let counts = RegClass::ALL.map(|c| isa.register_count(c));
        let rename_table = RegisterRenameTable::new(&mut regs, counts)?;
        Ok(Self {
            id,
            asid,
            state: ArchState::new(isa),
            predictor: BranchPredictor::new(&config.predictor),
            decode_buffer: DecodeBuffer::new(p.decode_buffer_size),
            rob: ReorderBuffer::new(p.rob_size),
            lsq: LoadStoreQueue::new(p.lsq_size),
            regs,
            rename_table,
            fetch_pc: 0,
            fetch_block: None,
            fetch_pending: false,
            fetch_halted: false,
            speculative: false,
            wrong_path_stalled: false,
            next_seq: 0,
            finished: true,
            idle_cycles: 0,
            stats: ThreadStats::default(),
        })
    }

    /// Starts executing at `entry`.
    pub fn start(&mut self, entry: u64) {
        self.state.pc = entry;
        self.state.halted = false;
        self.fetch_pc = entry;
        self.fetch_block = None;
        self.fetch_halted = false;
        self.speculative = false;
        self.wrong_path_stalled = false;
        self.finished = false;
        self.idle_cycles = 0;
    }

    /// Returns true if `entry` still names a live ROB or LSQ entry of this thread.
    pub fn is_alive(&self, entry: EntryRef) -> bool {
        match entry.kind {
            EntryKind::Rob => self.rob.find(entry.seq).is_some(),
            EntryKind::Lsq => self.lsq.find(entry.seq).is_some(),
        }
    }

    /// No instruction is in flight.
    pub fn is_drained(&self) -> bool {
        self.decode_buffer.is_empty() && self.rob.is_empty() && self.lsq.is_empty()
    }
}
