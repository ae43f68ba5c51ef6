//! Identifier and register types shared across modules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node (sequencer, cache, or memory controller) in the memory system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// Architectural register class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegClass {
    /// General-purpose integer registers.
    Integer,
    /// Floating-point registers.
    Float,
    /// Miscellaneous registers (condition flags).
    Misc,
}

impl RegClass {
    /// All classes in table order.
    pub const ALL: [Self; 3] = [Self::Integer, Self::Float, Self::Misc];

    /// Position of this class in per-class tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Integer => 0,
            Self::Float => 1,
            Self::Misc => 2,
        }
    }
}

impl fmt::Display for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "floating-point",
            Self::Misc => "misc",
        };
        f.write_str(name)
    }
}

/// A register dependency: class plus architectural register number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegDep {
    /// Register class.
    pub class: RegClass,
    /// Architectural register number within the class.
    pub num: usize,
}

impl RegDep {
    /// Integer register `num`.
    pub const fn int(num: usize) -> Self {
        Self {
            class: RegClass::Integer,
            num,
        }
    }

    /// Floating-point register `num`.
    pub const fn fp(num: usize) -> Self {
        Self {
            class: RegClass::Float,
            num,
        }
    }

    /// Miscellaneous register `num`.
    pub const fn misc(num: usize) -> Self {
        Self {
            class: RegClass::Misc,
            num,
        }
    }
}

/// Kind of functional unit an instruction needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuKind {
    /// Integer add/sub/logic/compare.
    IntAlu,
    /// Integer multiply.
    IntMult,
    /// Integer divide.
    IntDiv,
    /// Floating-point add and conversions.
    FpAdd,
    /// Floating-point multiply.
    FpMult,
    /// Floating-point divide.
    FpDiv,
    /// Address generation for loads.
    ReadPort,
    /// Address generation for stores.
    WritePort,
}
