//! # Unit Components
//!
//! Tests grouped by the crate module they exercise.

/// Configuration defaults, JSON loading, and validation.
pub mod config;

/// Directory MESI protocol: locking, requests, and directory invariants.
pub mod coherence;

/// Core internals: pipeline stages, register renaming, and branch prediction.
pub mod core;

/// Whole-program runs through the simulator.
pub mod sim;
