//! Core processor implementation.
//!
//! This module contains the out-of-order core and its parts: the per-thread
//! contexts, the pipeline structures and stages, and the execution units
//! (functional unit pool and branch predictor).

/// Core: shared queues, functional units, and stage orchestration.
pub mod cpu;

/// Out-of-order pipeline structures and stages.
pub mod pipeline;

/// Hardware thread contexts.
pub mod thread;

/// Execution units (functional unit pool, branch predictor).
pub mod units;

pub use self::cpu::Core;
pub use self::thread::Thread;
