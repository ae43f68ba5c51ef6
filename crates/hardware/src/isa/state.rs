//! Architectural register state.

use crate::common::{RegClass, RegDep};

use super::InstructionSet;

/// Register values and PC of one hardware thread.
///
/// Floating-point registers hold raw `f64` bits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchState {
    /// Program counter of the next instruction on the correct path.
    pub pc: u64,
    /// Integer registers.
    pub int: Vec<u64>,
    /// Floating-point registers.
    pub fp: Vec<u64>,
    /// Miscellaneous registers.
    pub misc: Vec<u64>,
    /// Set once a halt instruction has executed.
    pub halted: bool,
}

impl ArchState {
    /// Creates a zeroed state sized for `isa`.
    pub fn new(isa: &dyn InstructionSet) -> Self {
        Self {
            pc: 0,
            int: vec![0; isa.register_count(RegClass::Integer)],
            fp: vec![0; isa.register_count(RegClass::Float)],
            misc: vec![0; isa.register_count(RegClass::Misc)],
            halted: false,
        }
    }

    /// Reads the register named by `dep`.
    pub fn read(&self, dep: RegDep) -> u64 {
        self.file(dep.class)[dep.num]
    }

    /// Writes the register named by `dep`.
    pub fn write(&mut self, dep: RegDep, value: u64) {
        self.file_mut(dep.class)[dep.num] = value;
    }

    fn file(&self, class: RegClass) -> &[u64] {
        match class {
            RegClass::Integer => &self.int,
            RegClass::Float => &self.fp,
            RegClass::Misc => &self.misc,
        }
    }

    fn file_mut(&mut self, class: RegClass) -> &mut [u64] {
        match class {
            RegClass::Integer => &mut self.int,
            RegClass::Float => &mut self.fp,
            RegClass::Misc => &mut self.misc,
        }
    }
}
