//! Common utilities and types used throughout the simulator.
//!
//! This module provides the building blocks shared by the pipeline, the coherence
//! hierarchy, and the simulation driver. It includes:
//! 1. **Constants:** Predictor index shift, instruction size, and address-layout defaults.
//! 2. **Error Handling:** The crate-wide `SimError` and `SimResult` alias.
//! 3. **Identifiers:** Node identifiers, register classes, and functional-unit kinds.

/// Common constants used throughout the simulator.
pub mod constants;

/// Error type shared by every fallible operation in the crate.
pub mod error;

/// Small identifier and register types.
pub mod types;

pub use error::{SimError, SimResult};
pub use types::{FuKind, NodeId, RegClass, RegDep};
