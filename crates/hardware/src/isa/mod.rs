//! Instruction set interface.
//!
//! The pipeline never interprets instruction encodings itself. It consumes an
//! `InstructionSet` that decodes a word into a `StaticInstruction` (functional
//! unit, register dependencies, classification flags) and executes it against
//! an `ArchState`, producing a `DynamicInstruction` with the resolved next PC
//! and effective address.
//!
//! # Implementations
//!
//! * `mini`: A small fixed-width RISC used by the tests and the CLI, with an assembler.

/// Architectural register state of one hardware thread.
pub mod state;

/// The bundled reference instruction set.
pub mod mini;

use std::fmt;

use crate::common::{FuKind, RegClass, RegDep, SimResult};
use crate::mem::Memory;

pub use state::ArchState;

/// Classification flags of a decoded instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstFlags {
    /// Changes control flow (branch, jump, call, return).
    pub control: bool,
    /// Control transfer that depends on a condition.
    pub conditional: bool,
    /// Pushes a return address.
    pub call: bool,
    /// Returns through the link register.
    pub ret: bool,
    /// Reads memory.
    pub load: bool,
    /// Writes memory.
    pub store: bool,
    /// Has no effect.
    pub nop: bool,
    /// Stops the thread.
    pub halt: bool,
}

impl InstFlags {
    /// Loads and stores.
    pub const fn memory(&self) -> bool {
        self.load || self.store
    }
}

/// A decoded instruction, independent of any particular execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticInstruction {
    /// Raw encoding.
    pub raw: u32,
    /// Assembly mnemonic.
    pub mnemonic: &'static str,
    /// Encoded size in bytes.
    pub size: u64,
    /// Functional unit required, or `None` if the instruction completes without one.
    pub fu: Option<FuKind>,
    /// Classification.
    pub flags: InstFlags,
    /// Every register the instruction reads.
    pub input_deps: Vec<RegDep>,
    /// Every register the instruction writes.
    pub output_deps: Vec<RegDep>,
    /// Registers feeding the effective address (memory operations only).
    pub mem_addr_deps: Vec<RegDep>,
    /// Registers supplying store data (stores only).
    pub mem_data_deps: Vec<RegDep>,
}

/// One execution of a static instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicInstruction {
    /// Address of the instruction.
    pub pc: u64,
    /// Address of the next instruction on the executed path.
    pub next_pc: u64,
    /// Virtual effective address for memory operations.
    pub effective_addr: Option<u64>,
    /// The decoded instruction.
    pub inst: StaticInstruction,
}

impl DynamicInstruction {
    /// Fall-through address.
    pub const fn fallthrough(&self) -> u64 {
        self.pc + self.inst.size
    }

    /// Returns true if control left the fall-through path.
    pub const fn taken(&self) -> bool {
        self.next_pc != self.fallthrough()
    }
}

/// Decode and execute semantics consumed by the pipeline.
pub trait InstructionSet: fmt::Debug {
    /// Number of architectural registers in `class`.
    fn register_count(&self, class: RegClass) -> usize;

    /// Decodes the instruction at `pc`.
    fn decode(&self, pc: u64, memory: &Memory) -> SimResult<StaticInstruction>;

    /// Executes `inst` at `pc`, updating architectural state and memory.
    ///
    /// # Returns
    ///
    /// The executed instance with its actual next PC and effective address.
    fn execute(
        &self,
        pc: u64,
        inst: StaticInstruction,
        state: &mut ArchState,
        memory: &mut Memory,
    ) -> SimResult<DynamicInstruction>;

    /// Effective address `inst` would access under `state`, without side effects.
    fn effective_address(&self, inst: &StaticInstruction, state: &ArchState) -> Option<u64>;
}
