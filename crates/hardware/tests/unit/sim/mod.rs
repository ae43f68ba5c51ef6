//! # Simulator Tests

/// Reference programs and their architectural results.
pub mod programs;

/// Run control, reporting, and configuration errors.
pub mod run;
