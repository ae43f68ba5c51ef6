//! Issue Stages: LSQ refresh, wakeup, and selection.
//!
//! These three stages move entries between the core-wide queues:
//! 1. **Refresh:** Scans each LSQ from the head and queues loads that no older
//!    unresolved store can alias.
//! 2. **Wakeup:** Re-examines the waiting queue and promotes entries whose
//!    operands have been written back.
//! 3. **Selection:** Issues up to `issue_width` ready entries. Stores finish at
//!    once (the cache write happens at commit), loads forward from an older
//!    store or go to the data cache, and everything else takes a functional unit.
//!
//! Queued references to squashed entries fail to resolve and are dropped here.

use tracing::trace;

use crate::core::cpu::{Core, PendingAccess};
use crate::core::pipeline::{EntryKind, EntryRef, ForwardResult};
use crate::core::thread::Thread;
use crate::sim::CycleContext;

/// Queues every load that memory disambiguation allows to issue.
pub fn refresh_lsq_stage(core: &mut Core) {
    let Core { threads, ready, .. } = core;
    for thread in threads.iter_mut() {
        let Thread { lsq, regs, id, .. } = thread;
        let loads = lsq.issuable_loads(|s| s.ea_ready && regs.all_ready(&s.sources));
        for seq in loads {
            if let Some(load) = lsq.find_mut(seq) {
                load.status.in_ready_queue = true;
                ready.push(EntryRef {
                    thread: *id,
                    seq,
                    kind: EntryKind::Lsq,
                });
            }
        }
    }
}

/// Moves waiting entries with ready operands to the ready queue.
pub fn wakeup_stage(core: &mut Core) {
    let Core {
        threads,
        ready,
        waiting,
        ..
    } = core;
    for r in waiting.take() {
        let Some(Thread { rob, lsq, regs, .. }) = threads.get_mut(r.thread) else {
            continue;
        };
        let woken = match r.kind {
            EntryKind::Rob => match rob.find_mut(r.seq) {
                Some(e) if regs.all_ready(&e.sources) => {
                    e.status.in_ready_queue = true;
                    Some(true)
                }
                Some(_) => Some(false),
                None => None,
            },
            EntryKind::Lsq => match lsq.find_mut(r.seq) {
                Some(e) if e.ea_ready && regs.all_ready(&e.sources) => {
                    e.status.in_ready_queue = true;
                    Some(true)
                }
                Some(_) => Some(false),
                None => None,
            },
        };
        match woken {
            Some(true) => ready.push(r),
            Some(false) => waiting.push(r),
            None => {}
        }
    }
}

/// Issues up to `issue_width` live entries from the ready queue.
///
/// Entries beyond the width stay queued in their original order.
pub fn selection_stage(core: &mut Core, ctx: &mut CycleContext<'_>) {
    let queued = core.ready.take();
    let mut issued = 0;
    for r in queued {
        if !core.is_alive(r) {
            continue;
        }
        if issued >= core.issue_width {
            core.ready.push(r);
            continue;
        }
        issued += 1;
        issue(core, ctx, r);
    }
}

fn issue(core: &mut Core, ctx: &mut CycleContext<'_>, r: EntryRef) {
    let Core {
        threads,
        ooo,
        fu_pool,
        events,
        accesses,
        ports,
        ..
    } = core;
    let thread = &mut threads[r.thread];
    match r.kind {
        EntryKind::Lsq => {
            let Some(mem) = thread.lsq.find(r.seq) else {
                return;
            };
            let (is_store, paddr) = (mem.is_store, mem.paddr);
            if is_store {
                ooo.push(r);
            } else if let ForwardResult::Hit { store_seq } = thread.lsq.forward(r.seq, paddr) {
                trace!(thread = r.thread, seq = r.seq, store_seq, paddr, "load forwarded");
                thread.stats.forwarded_loads += 1;
                ooo.push(r);
            } else {
                let tag = accesses.issue(PendingAccess::Load(r));
                ctx.memory.load(ports.data, paddr, tag);
            }
            if let Some(mem) = thread.lsq.find_mut(r.seq) {
                mem.status.in_ready_queue = false;
                mem.status.issued = true;
            }
        }
        EntryKind::Rob => {
            let Some(entry) = thread.rob.find_mut(r.seq) else {
                return;
            };
            entry.status.in_ready_queue = false;
            entry.status.issued = true;
            match entry.inst.inst.fu {
                Some(kind) => {
                    let _ = fu_pool.acquire(kind, r, events);
                }
                None => ooo.push(r),
            }
        }
    }
}
