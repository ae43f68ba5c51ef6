//! Simulator error definitions.
//!
//! Every fallible operation in the crate reports a `SimError`. The variants fall into
//! three groups:
//! 1. **Pipeline Conditions:** Register exhaustion during rename and the commit watchdog.
//! 2. **Guest Faults:** Undecodable instructions and accesses to unmapped memory.
//! 3. **Host Errors:** Invalid configuration, assembly failures, and I/O.

use thiserror::Error;

use super::types::RegClass;

/// Errors produced while configuring or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Rename found no free physical register of the required class.
    ///
    /// The pipeline treats this as a stall; it only escapes when a caller asks the
    /// register file for a register directly.
    #[error("no free physical {class} register")]
    NoFreePhysicalRegister {
        /// Register class that ran dry.
        class: RegClass,
    },

    /// A running thread committed nothing for the configured number of cycles.
    #[error(
        "core {core} thread {thread} committed nothing for {idle_cycles} cycles (stopped at cycle {cycle})"
    )]
    CommitTimeout {
        /// Core index.
        core: usize,
        /// Thread index within the core.
        thread: usize,
        /// Cycle at which the watchdog fired.
        cycle: u64,
        /// Number of consecutive idle cycles observed.
        idle_cycles: u64,
    },

    /// The word at `pc` is not a valid instruction.
    #[error("illegal instruction {raw:#010x} at pc {pc:#x}")]
    IllegalInstruction {
        /// Address of the instruction.
        pc: u64,
        /// Raw encoding.
        raw: u32,
    },

    /// A functional access touched an address with no backing page.
    #[error("access to unmapped address {0:#x}")]
    UnmappedAddress(u64),

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Assembly source could not be translated.
    #[error("assembly error on line {line}: {message}")]
    Assembly {
        /// One-based source line.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Host I/O failure (reading configs or programs).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;
