//! Combined branch predictor.
//!
//! Lookup, training, and recovery for one hardware thread:
//! 1. **Lookup:** Conditional branches read both direction tables; the meta table
//!    picks the primary one. Targets come from the BTB; returns pop the RAS.
//! 2. **Update:** At commit, shift history, train both tables and the meta table,
//!    and install taken targets in the BTB.
//! 3. **Recover:** After a misprediction, roll the RAS back to its state at the
//!    mispredicted branch.
//!
//! Lookup returns `0` for "not taken / no target"; the fetch stage then falls through.

use serde::Serialize;

use super::bimodal::BimodalTable;
use super::btb::Btb;
use super::ras::Ras;
use super::two_level::TwoLevelTable;
use super::{COUNTER_INIT, COUNTER_TAKEN, train};
use crate::config::PredictorConfig;
use crate::isa::StaticInstruction;

/// Control-flow class of a predicted instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// Conditional branch.
    Conditional,
    /// Unconditional jump.
    Unconditional,
    /// Call (pushes the RAS).
    Call,
    /// Return (pops the RAS).
    Return,
}

impl BranchKind {
    /// Classifies a decoded instruction, or `None` if it is not control flow.
    pub const fn of(inst: &StaticInstruction) -> Option<Self> {
        let f = &inst.flags;
        if !f.control {
            None
        } else if f.ret {
            Some(Self::Return)
        } else if f.call {
            Some(Self::Call)
        } else if f.conditional {
            Some(Self::Conditional)
        } else {
            Some(Self::Unconditional)
        }
    }
}

/// Direction component chosen by the meta table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    /// Bimodal table.
    Bimodal,
    /// Two-level table.
    TwoLevel,
}

/// Everything `update` and `recover` need to know about one lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionRecord {
    /// Branch class.
    pub kind: BranchKind,
    /// Bimodal counter consulted (conditional branches).
    pub bimodal_idx: Option<usize>,
    /// Two-level counter consulted (conditional branches).
    pub two_level_idx: Option<usize>,
    /// Meta counter consulted (conditional branches).
    pub choice_idx: Option<usize>,
    /// Component whose direction was used.
    pub primary: Component,
    /// Bimodal direction at lookup.
    pub bimodal_taken: bool,
    /// Two-level direction at lookup.
    pub two_level_taken: bool,
    /// RAS top-of-stack before this lookup touched the stack.
    pub ras_tos: usize,
    /// Return address pushed by a call.
    pub return_addr: u64,
}

/// Counters kept by the predictor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PredictorStats {
    /// Control instructions looked up.
    pub lookups: u64,
    /// Updates at commit.
    pub updates: u64,
    /// Updates whose predicted next PC was correct.
    pub correct: u64,
    /// Returns predicted by the RAS.
    pub ras_lookups: u64,
    /// Recoveries performed.
    pub recoveries: u64,
}

/// Bimodal + two-level + meta predictor with BTB and RAS.
#[derive(Debug, Clone)]
pub struct BranchPredictor {
    bimodal: BimodalTable,
    two_level: TwoLevelTable,
    choice: Vec<u8>,
    btb: Btb,
    ras: Ras,
    /// Prediction statistics.
    pub stats: PredictorStats,
}

impl BranchPredictor {
    /// Builds a predictor from its configuration.
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            bimodal: BimodalTable::new(config.bimodal_size),
            two_level: TwoLevelTable::new(&config.two_level),
            choice: vec![COUNTER_INIT; config.choice_size],
            btb: Btb::new(config.btb_sets, config.btb_assoc),
            ras: Ras::new(config.ras_size),
            stats: PredictorStats::default(),
        }
    }

    fn choice_index(&self, addr: u64) -> usize {
        ((addr >> crate::common::constants::BRANCH_SHIFT) as usize) & (self.choice.len() - 1)
    }

    /// Predicts the next PC of the instruction at `addr`.
    ///
    /// # Returns
    ///
    /// `(target, record)`: `target` is `0` when the prediction is "fall through";
    /// `record` is `None` for non-control instructions.
    pub fn lookup(&mut self, addr: u64, inst: &StaticInstruction) -> (u64, Option<PredictionRecord>) {
        let Some(kind) = BranchKind::of(inst) else {
            return (0, None);
        };
        self.stats.lookups += 1;

        let mut record = PredictionRecord {
            kind,
            bimodal_idx: None,
            two_level_idx: None,
            choice_idx: None,
            primary: Component::Bimodal,
            bimodal_taken: false,
            two_level_taken: false,
            ras_tos: self.ras.tos(),
            return_addr: 0,
        };

        match kind {
            BranchKind::Conditional => {
                let b = self.bimodal.index(addr);
                let t = self.two_level.index(addr);
                let c = self.choice_index(addr);
                record.bimodal_idx = Some(b);
                record.two_level_idx = Some(t);
                record.choice_idx = Some(c);
                record.bimodal_taken = self.bimodal.taken(b);
                record.two_level_taken = self.two_level.taken(t);
                record.primary = if self.choice[c] >= COUNTER_TAKEN {
                    Component::TwoLevel
                } else {
                    Component::Bimodal
                };
            }
            BranchKind::Return => {
                self.stats.ras_lookups += 1;
                return (self.ras.pop(), Some(record));
            }
            BranchKind::Call => {
                record.return_addr = addr + inst.size;
                self.ras.push(record.return_addr);
            }
            BranchKind::Unconditional => {}
        }

        let target = match (kind, self.btb.lookup(addr)) {
            (_, None) => 0,
            (BranchKind::Conditional, Some(target)) => {
                let taken = match record.primary {
                    Component::Bimodal => record.bimodal_taken,
                    Component::TwoLevel => record.two_level_taken,
                };
                if taken { target } else { 0 }
            }
            (_, Some(target)) => target,
        };
        (target, Some(record))
    }

    /// Trains the predictor with a committed outcome.
    ///
    /// # Arguments
    ///
    /// * `addr` - Branch address.
    /// * `target` - Actual next PC.
    /// * `taken` - Whether control left the fall-through path.
    /// * `pred_taken` - Whether the lookup predicted taken.
    /// * `correct` - Whether the predicted next PC matched.
    /// * `record` - The record returned by `lookup`.
    pub fn update(
        &mut self,
        addr: u64,
        target: u64,
        taken: bool,
        pred_taken: bool,
        correct: bool,
        record: &PredictionRecord,
    ) {
        self.stats.updates += 1;
        if correct {
            self.stats.correct += 1;
        }
        tracing::trace!(addr, target, taken, pred_taken, correct, "predictor update");

        if record.kind == BranchKind::Conditional {
            self.two_level.shift(addr, taken);
        }
        if taken && record.kind != BranchKind::Return {
            self.btb.update(addr, target, record.kind);
        }

        if let (Some(b), Some(t)) = (record.bimodal_idx, record.two_level_idx) {
            train(self.bimodal.counter_mut(b), taken);
            train(self.two_level.counter_mut(t), taken);
            if let Some(c) = record.choice_idx {
                if record.bimodal_taken != record.two_level_taken {
                    train(&mut self.choice[c], record.two_level_taken == taken);
                }
            }
        }
    }

    /// Rolls the RAS back to its state just after the lookup that produced `record`.
    pub fn recover(&mut self, addr: u64, record: &PredictionRecord) {
        self.stats.recoveries += 1;
        tracing::trace!(addr, tos = record.ras_tos, "predictor recover");
        self.ras.restore(record.ras_tos);
        match record.kind {
            BranchKind::Call => self.ras.push(record.return_addr),
            BranchKind::Return => {
                let _ = self.ras.pop();
            }
            BranchKind::Conditional | BranchKind::Unconditional => {}
        }
    }

    /// The return address stack.
    pub const fn ras(&self) -> &Ras {
        &self.ras
    }

    /// The branch target buffer.
    pub const fn btb(&self) -> &Btb {
        &self.btb
    }

    /// Bimodal counter at `idx`.
    pub fn bimodal_counter(&self, idx: usize) -> u8 {
        self.bimodal.counter(idx)
    }

    /// Two-level counter at `idx`.
    pub fn two_level_counter(&self, idx: usize) -> u8 {
        self.two_level.counter(idx)
    }

    /// Meta counter at `idx`.
    pub fn choice_counter(&self, idx: usize) -> u8 {
        self.choice[idx]
    }
}
