//! Instruction Fetch Stage.
//!
//! Fetch works one cache line at a time. When the fetch PC leaves the line
//! currently held, the stage asks the instruction sequencer for the new line
//! and stalls until it arrives. Within a line it decodes up to `decode_width`
//! instructions per thread.
//!
//! On the correct path each instruction is executed functionally at once, so
//! the decode buffer entry carries the real next PC next to the predicted
//! one. After the first misprediction the thread is speculative: instructions
//! are only decoded and follow the predicted path until writeback recovers.

use tracing::trace;

use crate::common::SimResult;
use crate::core::cpu::{Core, PendingAccess};
use crate::core::pipeline::DecodeBufferEntry;
use crate::isa::DynamicInstruction;
use crate::sim::CycleContext;

/// Executes the fetch stage for every thread of `core`.
///
/// # Arguments
///
/// * `core` - The core whose threads fetch.
/// * `ctx` - Memory, address spaces, and the instruction set for this cycle.
///
/// # Returns
///
/// An error if a correct-path instruction cannot be decoded or executed.
pub fn fetch_stage(core: &mut Core, ctx: &mut CycleContext<'_>) -> SimResult<()> {
    let line_mask = !(core.line_size - 1);
    let Core {
        threads,
        accesses,
        ports,
        decode_width,
        ..
    } = core;

    for thread in threads.iter_mut() {
        if thread.finished || thread.fetch_halted || thread.fetch_pending || thread.wrong_path_stalled {
            continue;
        }

        let block = thread.fetch_pc & line_mask;
        if thread.fetch_block != Some(block) {
            let paddr = ctx.mmu.translate(thread.asid, block);
            let tag = accesses.issue(PendingAccess::Fetch {
                thread: thread.id,
                block,
            });
            ctx.memory.load(ports.fetch, paddr, tag);
            thread.fetch_pending = true;
            trace!(thread = thread.id, block, "fetch line");
            continue;
        }

        let space = thread.asid as usize;
        for _ in 0..*decode_width {
            if thread.decode_buffer.is_full() || (thread.fetch_pc & line_mask) != block {
                break;
            }
            let pc = thread.fetch_pc;

            let inst = if thread.speculative {
                let Ok(decoded) = ctx.isa.decode(pc, &ctx.spaces[space]) else {
                    thread.wrong_path_stalled = true;
                    break;
                };
                let effective_addr = ctx.isa.effective_address(&decoded, &thread.state);
                if decoded.flags.memory() && effective_addr.is_none() {
                    thread.wrong_path_stalled = true;
                    break;
                }
                DynamicInstruction {
                    pc,
                    next_pc: 0,
                    effective_addr,
                    inst: decoded,
                }
            } else {
                let decoded = ctx.isa.decode(pc, &ctx.spaces[space])?;
                ctx.isa.execute(pc, decoded, &mut thread.state, &mut ctx.spaces[space])?
            };

            let (target, prediction) = thread.predictor.lookup(pc, &inst.inst);
            let fallthrough = inst.fallthrough();
            let pred_npc = if target == 0 { fallthrough } else { target };

            let mut inst = inst;
            if thread.speculative {
                inst.next_pc = pred_npc;
            }
            let halt = inst.inst.flags.halt;
            let paddr = inst.effective_addr.map(|ea| ctx.mmu.translate(thread.asid, ea));
            let mispredicted = !thread.speculative && inst.next_pc != pred_npc;

            let seq = thread.next_seq;
            thread.next_seq += 1;
            thread.decode_buffer.push(DecodeBufferEntry {
                seq,
                inst,
                pred_npc,
                prediction,
                speculative: thread.speculative,
                paddr,
            });
            thread.stats.fetched += 1;

            if mispredicted {
                trace!(thread = thread.id, pc, pred_npc, "fetch enters wrong path");
                thread.speculative = true;
            }
            thread.fetch_pc = pred_npc;

            if halt {
                if thread.speculative && !mispredicted {
                    thread.wrong_path_stalled = true;
                } else {
                    thread.fetch_halted = true;
                }
                break;
            }
            if pred_npc != fallthrough {
                break;
            }
        }
    }
    Ok(())
}
