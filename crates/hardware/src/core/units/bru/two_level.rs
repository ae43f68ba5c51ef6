//! Two-level adaptive predictor.
//!
//! The first level holds per-branch history shift registers selected by branch
//! address; the second level holds 2-bit counters selected by combining that
//! history with the address (XOR or concatenation). With a single first-level
//! register this is a global-history predictor.

use super::{COUNTER_INIT, COUNTER_TAKEN};
use crate::common::constants::BRANCH_SHIFT;
use crate::config::{HistoryCombine, TwoLevelConfig};

/// History registers plus pattern table.
#[derive(Debug, Clone)]
pub struct TwoLevelTable {
    /// First-level history shift registers.
    histories: Vec<u32>,
    /// Second-level 2-bit counters.
    counters: Vec<u8>,
    history_mask: u32,
    history_size: u32,
    combine: HistoryCombine,
}

impl TwoLevelTable {
    /// Creates the table from its configuration.
    pub fn new(config: &TwoLevelConfig) -> Self {
        Self {
            histories: vec![0; config.l1_size],
            counters: vec![COUNTER_INIT; config.l2_size],
            history_mask: (1u32 << config.history_size) - 1,
            history_size: config.history_size,
            combine: config.combine,
        }
    }

    #[inline]
    fn history_index(&self, addr: u64) -> usize {
        ((addr >> BRANCH_SHIFT) as usize) & (self.histories.len() - 1)
    }

    /// Second-level counter index for `addr` under the current history.
    pub fn index(&self, addr: u64) -> usize {
        let history = u64::from(self.histories[self.history_index(addr)]);
        let shifted = addr >> BRANCH_SHIFT;
        let raw = match self.combine {
            HistoryCombine::Xor => history ^ shifted,
            HistoryCombine::Concat => (shifted << self.history_size) | history,
        };
        (raw as usize) & (self.counters.len() - 1)
    }

    /// Shifts the outcome into the history register of `addr`.
    pub fn shift(&mut self, addr: u64, taken: bool) {
        let idx = self.history_index(addr);
        let reg = &mut self.histories[idx];
        *reg = ((*reg << 1) | u32::from(taken)) & self.history_mask;
    }

    /// Current history of `addr`.
    pub fn history(&self, addr: u64) -> u32 {
        self.histories[self.history_index(addr)]
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
