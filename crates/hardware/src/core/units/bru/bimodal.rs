//! Bimodal predictor table.
//!
//! One 2-bit counter per entry, indexed by the branch address alone.

use super::{COUNTER_INIT, COUNTER_TAKEN};
use crate::common::constants::BRANCH_SHIFT;

/// Table of saturating counters indexed by `addr >> BRANCH_SHIFT`.
#[derive(Debug, Clone)]
pub struct BimodalTable {
    counters: Vec<u8>,
    mask: usize,
}

impl BimodalTable {
    /// Creates a table of `size` counters (power of two).
    pub fn new(size: usize) -> Self {
        Self {
            counters: vec![COUNTER_INIT; size],
            mask: size - 1,
        }
    }

    /// Counter index for a branch address.
    #[inline]
    pub const fn index(&self, addr: u64) -> usize {
        ((addr >> BRANCH_SHIFT) as usize) & self.mask
    }

    /// Direction predicted by counter `idx`.
    #[inline]
    pub fn taken(&self, idx: usize) -> bool {
        self.counters[idx] >= COUNTER_TAKEN
    }

    /// Counter value at `idx`.
    pub fn counter(&self, idx: usize) -> u8 {
        self.counters[idx]
    }

    /// Mutable counter at `idx`.
    pub fn counter_mut(&mut self, idx: usize) -> &mut u8 {
        &mut self.counters[idx]
    }
}
