//! Multicore out-of-order processor simulator library.
//!
//! This crate implements a cycle-level model of a multicore, multithreaded
//! out-of-order processor with the following:
//! 1. **Core:** Per-thread fetch, rename, dispatch, wakeup, selection, writeback, and
//!    commit, with reorder buffer, load/store queue, physical register renaming,
//!    functional unit arbitration, and misprediction recovery.
//! 2. **Branch Prediction:** Combined bimodal and two-level predictor with a BTB and RAS.
//! 3. **Coherence:** Private L1 caches and a shared L2 kept coherent by a
//!    directory-based MESI protocol with lock-guarded sets.
//! 4. **ISA:** An instruction set interface plus the bundled `mini` ISA and assembler.
//! 5. **Simulation:** Event queues, round-robin arbitration, the cycle loop, and statistics.

/// Directory-based MESI coherence (caches, transactions, protocol engine).
pub mod coherence;
/// Common types and constants (identifiers, register classes, errors).
pub mod common;
/// Simulator configuration (defaults, validation, JSON loading).
pub mod config;
/// Processor core (threads, pipeline stages, functional units, branch predictor).
pub mod core;
/// Instruction set interface and the mini reference ISA.
pub mod isa;
/// Guest memory images and the MMU.
pub mod mem;
/// Event queue, arbitration, and the top-level simulator.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// The coherent memory hierarchy shared by all cores.
pub use crate::coherence::MemorySystem;
/// Error type returned by every fallible operation.
pub use crate::common::{SimError, SimResult};
/// One out-of-order core.
pub use crate::core::Core;
/// Top-level processor; construct with `Simulator::new` or `Simulator::with_mini_isa`.
pub use crate::sim::Simulator;
