//! Pipeline stage implementations.
//!
//! Every stage is a free function over a `Core`. The core calls them once per
//! cycle in reverse data-flow order:
//! 1. **Commit:** Retires completed instructions in program order and runs the watchdog.
//! 2. **Writeback:** Drains finished entries and recovers from mispredictions.
//! 3. **Refresh LSQ:** Releases loads that no older unresolved store can alias.
//! 4. **Wakeup:** Moves waiting entries whose operands became ready.
//! 5. **Selection:** Issues ready entries to functional units, forwarding, or the data cache.
//! 6. **Dispatch:** Places renamed entries in the ready or waiting queue.
//! 7. **Rename:** Maps destination registers and allocates ROB and LSQ entries.
//! 8. **Fetch:** Reads instruction lines, executes functionally, and predicts the next PC.

/// Commit stage implementation.
pub mod commit;

/// Dispatch stage implementation.
pub mod dispatch;

/// Instruction fetch stage implementation.
pub mod fetch;

/// Refresh, wakeup, and selection stages.
pub mod issue;

/// Register rename stage implementation.
pub mod rename;

/// Writeback stage and misprediction recovery.
pub mod writeback;

pub use commit::commit_stage;
pub use dispatch::dispatch_stage;
pub use fetch::fetch_stage;
pub use issue::{refresh_lsq_stage, selection_stage, wakeup_stage};
pub use rename::rename_stage;
pub use writeback::{recover_reorder_buffer, writeback_stage};
