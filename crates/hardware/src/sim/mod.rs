//! Simulation driver.
//!
//! This module contains the pieces that advance simulated time:
//! 1. **Event Queue:** A delayed-event queue keyed by absolute cycle; every latency in the model is one.
//! 2. **Round Robin:** The width-limited, stall-aware thread arbitration used by pipeline stages.
//! 3. **Simulator:** The processor: cores, the memory system, and the global cycle loop.

/// Delayed-event queue keyed by absolute cycle.
pub mod event;

/// Round-robin arbitration across threads for width-limited stages.
pub mod round_robin;

/// Top-level processor and cycle loop.
pub mod simulator;

pub use event::EventQueue;
pub use round_robin::{RoundRobin, Step};
pub use simulator::{CycleContext, RunOutcome, Simulator};
