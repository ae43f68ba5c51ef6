//! # Coherence Tests

/// Set locking, retries, and transient tags.
pub mod locking;

/// Processor accesses and cross-node requests.
pub mod requests;

/// Directory invariants under multi-core traffic.
pub mod invariants;
