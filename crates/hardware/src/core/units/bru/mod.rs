//! Branch prediction unit (BRU).
//!
//! The combined predictor pairs a bimodal table with a two-level adaptive
//! table and lets a meta table choose between them per branch. Targets come
//! from a set-associative branch target buffer with MRU ordering; returns are
//! predicted by a circular return address stack.

pub use self::branch_predictor::{
    BranchKind, BranchPredictor, Component, PredictionRecord, PredictorStats,
};

/// Bimodal (per-address) 2-bit counter table.
pub mod bimodal;

/// Combined predictor: lookup, update, and recovery.
pub mod branch_predictor;

/// Set-associative Branch Target Buffer with per-set MRU lists.
pub mod btb;

/// Circular Return Address Stack.
pub mod ras;

/// Two-level adaptive predictor with per-branch history.
pub mod two_level;

/// Largest value of a 2-bit saturating counter.
pub const COUNTER_MAX: u8 = 3;

/// Threshold at or above which a counter predicts taken.
pub const COUNTER_TAKEN: u8 = 2;

/// Initial counter value (weakly not taken).
pub const COUNTER_INIT: u8 = 1;

/// Moves a 2-bit counter one step toward `up`, saturating at both ends.
#[inline]
pub fn train(counter: &mut u8, up: bool) {
    if up {
        if *counter < COUNTER_MAX {
            *counter += 1;
        }
    } else if *counter > 0 {
        *counter -= 1;
    }
}
