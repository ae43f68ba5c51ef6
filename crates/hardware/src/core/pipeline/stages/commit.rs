//! Commit Stage.
//!
//! Retires completed instructions from the ROB head in program order. A memory
//! instruction also needs its LSQ head to be complete; a store writes the data
//! cache only now. Retiring frees the register each destination replaced and
//! trains the branch predictor with the real outcome.
//!
//! The stage also runs the watchdog: a running thread that commits nothing for
//! `commit_timeout` consecutive cycles aborts the simulation.

use std::convert::Infallible;

use tracing::{debug, warn};

use crate::coherence::{CorePorts, MemorySystem};
use crate::common::{SimError, SimResult};
use crate::core::cpu::{AccessTracker, Core, PendingAccess};
use crate::core::thread::Thread;
use crate::sim::{CycleContext, Step};

/// Executes the commit stage, sharing `commit_width` slots round-robin across threads.
///
/// # Returns
///
/// `SimError::CommitTimeout` when the watchdog fires.
pub fn commit_stage(core: &mut Core, ctx: &mut CycleContext<'_>) -> SimResult<()> {
    let Core {
        id,
        threads,
        commit_rr,
        commit_width,
        accesses,
        ports,
        commit_timeout,
        ..
    } = core;
    let before: Vec<u64> = threads.iter().map(|t| t.stats.committed).collect();
    let len = threads.len();
    let _ = commit_rr.run(len, *commit_width, |t| {
        Ok::<_, Infallible>(commit_one(&mut threads[t], ctx.memory, *ports, accesses))
    });

    for (thread, committed_before) in threads.iter_mut().zip(before) {
        if thread.stats.committed != committed_before {
            thread.idle_cycles = 0;
            continue;
        }
        if thread.finished {
            continue;
        }
        thread.idle_cycles += 1;
        if thread.idle_cycles >= *commit_timeout {
            warn!(
                core = *id,
                thread = thread.id,
                cycle = ctx.cycle,
                idle_cycles = thread.idle_cycles,
                "commit watchdog expired"
            );
            return Err(SimError::CommitTimeout {
                core: *id,
                thread: thread.id,
                cycle: ctx.cycle,
                idle_cycles: thread.idle_cycles,
            });
        }
    }
    Ok(())
}

fn commit_one(
    thread: &mut Thread,
    memory: &mut MemorySystem,
    ports: CorePorts,
    accesses: &mut AccessTracker,
) -> Step {
    let Some(head) = thread.rob.head() else {
        return Step::Stall;
    };
    if !head.status.completed {
        return Step::Stall;
    }
    if head.has_lsq
        && !thread
            .lsq
            .head()
            .is_some_and(|m| m.seq == head.seq && m.status.completed)
    {
        return Step::Stall;
    }
    let Some(entry) = thread.rob.pop_head() else {
        return Step::Stall;
    };

    if entry.has_lsq {
        if let Some(mem) = thread.lsq.pop_head() {
            if mem.is_store {
                let tag = accesses.issue(PendingAccess::Store);
                memory.store(ports.data, mem.paddr, tag);
                thread.stats.stores += 1;
            } else {
                thread.stats.loads += 1;
            }
            for out in &mem.outputs {
                thread.regs.commit(out.new);
                thread.regs.dealloc(out.old);
            }
        }
    }
    for out in &entry.outputs {
        thread.regs.commit(out.new);
        thread.regs.dealloc(out.old);
    }

    let inst = &entry.inst;
    if let Some(record) = entry.prediction {
        let correct = entry.pred_npc == inst.next_pc;
        thread.predictor.update(
            inst.pc,
            inst.next_pc,
            inst.taken(),
            entry.pred_npc != inst.fallthrough(),
            correct,
            &record,
        );
        thread.stats.branches += 1;
        if !correct {
            thread.stats.mispredictions += 1;
        }
    }
    thread.stats.committed += 1;
    if inst.inst.flags.halt {
        thread.finished = true;
        debug!(thread = thread.id, pc = inst.pc, "thread halted");
    }
    Step::Progress
}
