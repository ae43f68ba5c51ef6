//! Register Rename Stage.
//!
//! Pops decoded instructions in program order, maps their sources through the
//! rename table, and allocates fresh physical registers for their
//! destinations. A memory instruction is split in two: its ROB entry computes
//! the effective address from `mem_addr_deps`, while its LSQ entry carries the
//! store data (`mem_data_deps`) and the load destination.
//!
//! A thread stalls for the rest of the cycle when its ROB or LSQ is full or a
//! register class cannot supply every destination.

use crate::common::{RegClass, SimResult};
use crate::core::cpu::Core;
use crate::core::pipeline::{EntryKind, EntryRef, EntryStatus, LsqEntry, Rename, RobEntry};
use crate::core::thread::Thread;
use crate::sim::Step;

/// Executes the rename stage, sharing `decode_width` slots round-robin across threads.
pub fn rename_stage(core: &mut Core) -> SimResult<()> {
    let Core {
        threads,
        rename_rr,
        decode_width,
        ..
    } = core;
    let len = threads.len();
    let _ = rename_rr.run(len, *decode_width, |t| rename_one(&mut threads[t]))?;
    Ok(())
}

/// Renames the oldest decode buffer entry of `thread`.
fn rename_one(thread: &mut Thread) -> SimResult<Step> {
    let Some(front) = thread.decode_buffer.front() else {
        return Ok(Step::Stall);
    };
    let flags = front.inst.inst.flags;
    if flags.nop {
        let _ = thread.decode_buffer.pop();
        return Ok(Step::Progress);
    }

    let mut needed = [0usize; 3];
    for dep in &front.inst.inst.output_deps {
        needed[dep.class.index()] += 1;
    }
    let regs_short = RegClass::ALL
        .iter()
        .any(|&c| thread.regs.free_count(c) < needed[c.index()]);
    if thread.rob.is_full() || (flags.memory() && thread.lsq.is_full()) || regs_short {
        thread.stats.rename_stalls += 1;
        return Ok(Step::Stall);
    }

    let Some(entry) = thread.decode_buffer.pop() else {
        return Ok(Step::Stall);
    };
    let seq = entry.seq;
    let inst = &entry.inst.inst;

    let rob_deps = if flags.memory() { &inst.mem_addr_deps } else { &inst.input_deps };
    let rob_sources: Vec<_> = rob_deps.iter().map(|&d| thread.rename_table.lookup(d)).collect();
    let lsq_sources: Vec<_> = if flags.memory() {
        inst.mem_data_deps.iter().map(|&d| thread.rename_table.lookup(d)).collect()
    } else {
        Vec::new()
    };

    let owner = EntryRef {
        thread: thread.id,
        seq,
        kind: if flags.memory() { EntryKind::Lsq } else { EntryKind::Rob },
    };
    let mut outputs = Vec::with_capacity(inst.output_deps.len());
    for &dep in &inst.output_deps {
        let new = thread.regs.alloc(dep.class, Some(owner))?;
        let old = thread.rename_table.set(dep, new);
        outputs.push(Rename { dep, old, new });
    }

    let (rob_outputs, lsq_outputs) = if flags.memory() {
        (Vec::new(), outputs)
    } else {
        (outputs, Vec::new())
    };

    if flags.memory() {
        let pushed = thread.lsq.push(LsqEntry {
            seq,
            is_store: flags.store,
            vaddr: entry.inst.effective_addr.unwrap_or(0),
            paddr: entry.paddr.unwrap_or(0),
            sources: lsq_sources,
            outputs: lsq_outputs,
            status: EntryStatus::default(),
            ea_ready: false,
            speculative: entry.speculative,
        });
        debug_assert!(pushed.is_ok(), "LSQ capacity checked before rename");
    }
    let pushed = thread.rob.push(RobEntry {
        seq,
        inst: entry.inst,
        pred_npc: entry.pred_npc,
        prediction: entry.prediction,
        speculative: entry.speculative,
        sources: rob_sources,
        outputs: rob_outputs,
        status: EntryStatus::default(),
        has_lsq: flags.memory(),
    });
    debug_assert!(pushed.is_ok(), "ROB capacity checked before rename");
    Ok(Step::Progress)
}
