//! Pipeline Tests.
//!
//! Runs small programs on one core and inspects the in-flight buffers,
//! the rename state, and the per-thread counters.

use mcsim_core::common::{FuKind, RegClass, SimError};
use mcsim_core::core::pipeline::PhysRegState;
use mcsim_core::core::Thread;

use crate::common::harness::{TestContext, small_config};

const SUM_LOOP: &str = "
        li r1, 10
        li r2, 0
    loop:
        add r2, r2, r1
        addi r1, r1, -1
        bnez r1, loop
        halt
";

fn assert_buffers_ordered(thread: &Thread) {
    let rob: Vec<u64> = thread.rob.iter().map(|e| e.seq).collect();
    let lsq: Vec<u64> = thread.lsq.iter().map(|e| e.seq).collect();
    assert!(rob.windows(2).all(|w| w[0] < w[1]), "ROB out of order: {rob:?}");
    assert!(lsq.windows(2).all(|w| w[0] < w[1]), "LSQ out of order: {lsq:?}");
    for seq in &lsq {
        assert!(rob.contains(seq), "LSQ entry {seq} has no ROB entry");
    }
}

#[test]
fn store_forwards_to_younger_load() {
    let mut ctx = TestContext::new().load(
        0,
        "
        lui r2, 0x10
        li r3, 7
        st r3, 8(r2)
        ld r4, 8(r2)
        addi r4, r4, 7
        halt
    ",
    );
    let stats = ctx.run();

    assert_eq!(ctx.reg(0, 4), 14);
    let t = &stats.threads[0].stats;
    assert_eq!(t.loads, 1);
    assert_eq!(t.stores, 1);
    assert_eq!(t.forwarded_loads, 1);
}

#[test]
fn buffers_stay_in_program_order_every_cycle() {
    let mut ctx = TestContext::new().load(
        0,
        "
        lui r2, 0x10
        li r1, 8
    loop:
        st r1, 0(r2)
        ld r3, 0(r2)
        add r4, r4, r3
        addi r2, r2, 8
        addi r1, r1, -1
        bnez r1, loop
        halt
    ",
    );
    while !ctx.sim.is_finished() {
        assert!(ctx.sim.cycle() < 50_000, "program did not finish");
        ctx.sim.tick().unwrap();
        assert_buffers_ordered(ctx.thread(0));
    }
    assert_eq!(ctx.reg(0, 4), (1..=8).sum::<u64>());
}

#[test]
fn misprediction_squashes_and_recovers() {
    let mut ctx = TestContext::new().load(0, SUM_LOOP);
    let stats = ctx.run();

    assert_eq!(ctx.reg(0, 2), 55);
    let report = &stats.threads[0];
    assert_eq!(report.stats.committed, 33);
    assert_eq!(report.stats.branches, 10);
    assert!(report.stats.mispredictions >= 1);
    assert!(report.stats.squashed > 0);
    assert_eq!(report.predictor.recoveries, report.stats.mispredictions);
    assert!(report.stats.fetched >= report.stats.committed);
}

#[test]
fn drained_thread_holds_only_architectural_registers() {
    let mut ctx = TestContext::new().load(0, SUM_LOOP);
    let _ = ctx.run();

    let config = ctx.sim.config().processor.clone();
    let thread = ctx.thread(0);
    assert!(thread.rob.is_empty());
    assert!(thread.lsq.is_empty());
    for reg in thread.rename_table.iter() {
        assert_eq!(thread.regs.state(reg), PhysRegState::Architectural);
    }
    assert_eq!(thread.regs.free_count(RegClass::Integer), config.phys_int_regs - 32);
    assert_eq!(thread.regs.free_count(RegClass::Float), config.phys_fp_regs - 32);
    assert_eq!(thread.regs.free_count(RegClass::Misc), config.phys_misc_regs - 1);
}

#[test]
fn nops_are_not_committed() {
    let mut ctx = TestContext::new().load(0, "nop\nnop\nli r1, 3\nnop\nhalt");
    let stats = ctx.run();
    assert_eq!(stats.threads[0].stats.committed, 2);
    assert_eq!(ctx.reg(0, 1), 3);
}

#[test]
fn calls_return_through_the_stack() {
    let mut ctx = TestContext::new().load(
        0,
        "
        call bump
        call bump
        halt
    bump:
        addi r5, r5, 1
        ret
    ",
    );
    let stats = ctx.run();
    assert_eq!(ctx.reg(0, 5), 2);
    assert!(stats.threads[0].predictor.ras_lookups >= 2);
}

const NESTED_CALLS: &str = "
        call outer
        addi r5, r5, 100
        halt
    outer:
        mov r20, r31
        call middle
        addi r5, r5, 10
        mov r31, r20
        ret
    middle:
        mov r21, r31
        call inner
        addi r5, r5, 1
        mov r31, r21
        ret
    inner:
        ret
";

fn run_nested_calls(ras_size: usize) -> (TestContext, u64) {
    let mut config = small_config(1, 1);
    config.predictor.ras_size = ras_size;
    let mut ctx = TestContext::with_config(config).load(0, NESTED_CALLS);
    let stats = ctx.run();
    let report = &stats.threads[0];
    assert_eq!(report.predictor.recoveries, report.stats.mispredictions);
    (ctx, report.stats.mispredictions)
}

#[test]
fn two_entry_ras_recovers_every_return_of_three_nested_calls() {
    let (deep, deep_mispredictions) = run_nested_calls(8);
    let (shallow, shallow_mispredictions) = run_nested_calls(2);

    // Each return lands back at its caller, so every caller's add runs once.
    assert_eq!(shallow.reg(0, 5), 111);
    assert_eq!(deep.reg(0, 5), 111);
    assert_eq!(shallow.reg(0, 31), deep.reg(0, 31));
    // The third push overwrote the outermost return address.
    assert!(shallow_mispredictions > deep_mispredictions);
}

#[test]
fn commit_watchdog_fires_without_an_alu() {
    let mut config = small_config(1, 1);
    config
        .processor
        .functional_units
        .retain(|fu| fu.kind != FuKind::IntAlu);
    config.general.commit_timeout = 50;
    let mut ctx = TestContext::with_config(config).load(0, "li r1, 1\nhalt");

    match ctx.run_err() {
        SimError::CommitTimeout {
            core,
            thread,
            idle_cycles,
            ..
        } => {
            assert_eq!((core, thread), (0, 0));
            assert_eq!(idle_cycles, 50);
        }
        other => panic!("expected a commit timeout, got {other}"),
    }
}

#[test]
fn idle_thread_does_not_trip_the_watchdog() {
    let mut config = small_config(1, 2);
    config.general.commit_timeout = 100;
    let mut ctx = TestContext::with_config(config).load(0, SUM_LOOP);
    let stats = ctx.run();
    assert_eq!(stats.threads[1].stats.committed, 0);
    assert_eq!(ctx.reg(0, 2), 55);
}

#[test]
fn smt_threads_interleave_on_one_core() {
    let mut ctx = TestContext::with_config(small_config(1, 2))
        .load(0, SUM_LOOP)
        .load(1, "li r1, 4\nli r2, 5\nmul r3, r1, r2\nhalt");
    let stats = ctx.run();

    assert_eq!(ctx.reg(0, 2), 55);
    assert_eq!(ctx.reg(1, 3), 20);
    assert_eq!(stats.threads[0].stats.committed, 33);
    assert_eq!(stats.threads[1].stats.committed, 4);
}
