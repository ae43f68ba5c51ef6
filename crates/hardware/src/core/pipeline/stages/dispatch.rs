//! Dispatch Stage.
//!
//! Moves renamed ROB entries into the ready queue when every source is
//! readable and into the waiting queue otherwise. A paired store LSQ entry
//! follows the same rule once its address is known; loads are left to the
//! LSQ refresh, which also applies memory disambiguation.

use std::convert::Infallible;

use crate::core::cpu::Core;
use crate::core::pipeline::{EntryKind, EntryRef, ReadyQueue, WaitingQueue};
use crate::core::thread::Thread;
use crate::sim::Step;

/// Executes the dispatch stage, sharing `decode_width` slots round-robin across threads.
pub fn dispatch_stage(core: &mut Core) {
    let Core {
        threads,
        dispatch_rr,
        ready,
        waiting,
        decode_width,
        ..
    } = core;
    let len = threads.len();
    let _ = dispatch_rr.run(len, *decode_width, |t| {
        Ok::<_, Infallible>(dispatch_one(&mut threads[t], ready, waiting))
    });
}

fn dispatch_one(thread: &mut Thread, ready: &mut ReadyQueue, waiting: &mut WaitingQueue) -> Step {
    let Thread { rob, lsq, regs, id, .. } = thread;
    let Some(entry) = rob.iter_mut().find(|e| !e.status.dispatched) else {
        return Step::Stall;
    };
    entry.status.dispatched = true;
    let seq = entry.seq;
    let rob_ref = EntryRef {
        thread: *id,
        seq,
        kind: EntryKind::Rob,
    };
    if regs.all_ready(&entry.sources) {
        entry.status.in_ready_queue = true;
        ready.push(rob_ref);
    } else {
        waiting.push(rob_ref);
    }

    if entry.has_lsq {
        if let Some(mem) = lsq.find_mut(seq) {
            mem.status.dispatched = true;
            if mem.is_store {
                let lsq_ref = EntryRef {
                    kind: EntryKind::Lsq,
                    ..rob_ref
                };
                if mem.ea_ready && regs.all_ready(&mem.sources) {
                    mem.status.in_ready_queue = true;
                    ready.push(lsq_ref);
                } else {
                    waiting.push(lsq_ref);
                }
            }
        }
    }
    Step::Progress
}
