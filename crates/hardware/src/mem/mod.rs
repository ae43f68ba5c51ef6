//! Guest memory and address translation.
//!
//! 1. **Memory:** A sparse, page-granular byte image per address space; functional
//!    execution reads and writes it directly.
//! 2. **MMU:** Maps `(address space, virtual page)` to physical pages for the timing
//!    model; physical addresses are what the coherence hierarchy sees.

/// Sparse paged guest memory.
pub mod memory;

/// Virtual-to-physical page allocation.
pub mod mmu;

pub use memory::Memory;
pub use mmu::Mmu;
