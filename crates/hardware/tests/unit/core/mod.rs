//! # Core Tests

/// Out-of-order pipeline behaviour observed through whole programs.
pub mod pipeline;

/// Branch predictor, BTB, and RAS.
pub mod predictor;

/// Physical register allocation.
pub mod regfile;
