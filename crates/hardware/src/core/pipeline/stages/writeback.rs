//! Writeback Stage.
//!
//! Drains the out-of-order completion queue in FIFO order. A completed entry
//! marks its destination registers written back; a ROB entry of a memory
//! operation also releases its LSQ partner's address.
//!
//! When a correct-path entry turns out to be mispredicted, the predictor is
//! repaired, every younger speculative entry is squashed, and fetch is
//! redirected. Draining stops for the cycle after a recovery.

use tracing::debug;

use crate::core::cpu::Core;
use crate::core::pipeline::{EntryKind, Rename};
use crate::core::thread::Thread;

/// Executes the writeback stage.
pub fn writeback_stage(core: &mut Core) {
    while let Some(r) = core.ooo.pop() {
        let Some(thread) = core.threads.get_mut(r.thread) else {
            continue;
        };
        match r.kind {
            EntryKind::Lsq => {
                let Thread { lsq, regs, .. } = thread;
                if let Some(mem) = lsq.find_mut(r.seq) {
                    mem.status.completed = true;
                    for out in &mem.outputs {
                        regs.writeback(out.new);
                    }
                }
            }
            EntryKind::Rob => {
                let Thread { rob, lsq, regs, .. } = thread;
                let Some(entry) = rob.find_mut(r.seq) else {
                    continue;
                };
                entry.status.completed = true;
                for out in &entry.outputs {
                    regs.writeback(out.new);
                }
                if entry.has_lsq {
                    if let Some(mem) = lsq.find_mut(r.seq) {
                        mem.ea_ready = true;
                    }
                }
                if entry.speculative || !entry.mispredicted() {
                    continue;
                }

                let pc = entry.inst.pc;
                let next_pc = entry.inst.next_pc;
                if let Some(record) = entry.prediction {
                    thread.predictor.recover(pc, &record);
                }
                let squashed = recover_reorder_buffer(thread);
                let flushed = thread.decode_buffer.clear();
                thread.stats.squashed += (squashed + flushed) as u64;
                thread.fetch_pc = next_pc;
                thread.speculative = false;
                thread.wrong_path_stalled = false;
                debug!(
                    thread = thread.id,
                    pc,
                    next_pc,
                    squashed,
                    flushed,
                    "misprediction recovered"
                );
                break;
            }
        }
    }
}

/// Squashes speculative entries from the tail of the ROB.
///
/// Each squashed instruction gives back its destination registers and restores
/// the mappings it replaced, youngest first. The paired LSQ tail goes with it.
///
/// # Returns
///
/// The number of ROB entries removed.
pub fn recover_reorder_buffer(thread: &mut Thread) -> usize {
    let mut squashed = 0;
    while thread.rob.tail().is_some_and(|e| e.speculative) {
        let Some(entry) = thread.rob.pop_tail() else {
            break;
        };
        if thread.lsq.tail().is_some_and(|m| m.seq == entry.seq) {
            if let Some(mem) = thread.lsq.pop_tail() {
                undo_renames(thread, &mem.outputs);
            }
        }
        undo_renames(thread, &entry.outputs);
        squashed += 1;
    }
    squashed
}

fn undo_renames(thread: &mut Thread, outputs: &[Rename]) {
    for out in outputs.iter().rev() {
        thread.regs.dealloc(out.new);
        let _ = thread.rename_table.set(out.dep, out.old);
    }
}
