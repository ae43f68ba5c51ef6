//! Shared test infrastructure.

/// Simulator harness for assembly-level tests.
pub mod harness;
