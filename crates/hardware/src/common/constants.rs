//! Global simulator constants.
//!
//! This module defines the constants that are not worth a configuration knob:
//! 1. **Instruction Constants:** The fixed instruction width of the bundled ISA.
//! 2. **Predictor Constants:** How many low PC bits are dropped before indexing tables.
//! 3. **Layout Constants:** Where the loader places code and data by default.

/// Size of an encoded instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Number of low address bits discarded before indexing predictor tables.
pub const BRANCH_SHIFT: u32 = 2;

/// Default base address at which assembled programs are loaded.
pub const CODE_BASE: u64 = 0x1000;

/// Default base address of the per-thread data region.
pub const DATA_BASE: u64 = 0x10_0000;

/// Default size of the per-thread data region in bytes.
pub const DATA_SIZE: u64 = 0x1_0000;
