//! Execution units and functional components.
//!
//! This module contains the branch prediction unit and the functional unit
//! pool that arbitrates execution resources among issued instructions.

/// Branch prediction unit: direction tables, BTB, and RAS.
pub mod bru;

/// Typed, latency-tagged functional units with busy/retry arbitration.
pub mod fu;
