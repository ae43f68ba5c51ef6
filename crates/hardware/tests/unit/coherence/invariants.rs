//! Directory invariants under multi-core traffic.

use mcsim_core::common::constants::DATA_BASE;

use crate::common::harness::{TestContext, small_config};

/// Each iteration reads, bumps, and stores one word, then reads its neighbour line.
const COUNTER_LOOP: &str = "
        lui r2, 0x10
        li r3, 20
    loop:
        ld r4, 0(r2)
        addi r4, r4, 1
        st r4, 0(r2)
        ld r5, 0x40(r2)
        add r6, r6, r5
        addi r3, r3, -1
        bnez r3, loop
        halt
";

const COUNTER_LOOP_COMMITS: u64 = 2 + 7 * 20 + 1;

#[test]
fn shared_counter_keeps_directories_consistent() {
    let mut ctx = TestContext::with_config(small_config(2, 2)).shared_address_space();
    for t in 0..4 {
        ctx = ctx.load(t, COUNTER_LOOP);
    }

    let limit = ctx.sim.config().general.max_cycles;
    while !ctx.sim.is_finished() {
        assert!(ctx.sim.cycle() < limit, "threads did not finish");
        ctx.sim.tick().unwrap();
        let violations = ctx.sim.memory().directory_violations();
        assert!(
            violations.is_empty(),
            "cycle {}: inconsistent directory entries {violations:?}",
            ctx.sim.cycle()
        );
    }

    let stats = ctx.sim.stats();
    for report in &stats.threads {
        assert_eq!(report.stats.committed, COUNTER_LOOP_COMMITS);
        assert_eq!(report.stats.stores, 20);
        assert_eq!(report.stats.loads, 40);
    }
    assert_eq!(stats.committed, 4 * COUNTER_LOOP_COMMITS);
    let invalidations: u64 = stats.caches.iter().map(|c| c.stats.invalidations).sum();
    assert!(invalidations > 0);
}

#[test]
fn four_writers_of_one_counter_all_finish() {
    let mut ctx = TestContext::with_config(small_config(4, 1)).shared_address_space();
    for t in 0..4 {
        ctx = ctx.load(t, COUNTER_LOOP);
    }
    let stats = ctx.run();

    assert_eq!(stats.committed, 4 * COUNTER_LOOP_COMMITS);
    assert_eq!(ctx.sim.memory().in_flight(), 0);
    assert!(ctx.sim.memory().directory_violations().is_empty());
    let l1d_invalidations: u64 = (0..4)
        .map(|c| {
            let l1d = ctx.sim.memory().l1_data(c);
            ctx.sim.memory().cache_stats(l1d).unwrap().invalidations
        })
        .sum();
    assert!(l1d_invalidations > 0);
}

#[test]
fn private_address_spaces_do_not_interfere() {
    let mut ctx = TestContext::with_config(small_config(2, 1))
        .load(0, COUNTER_LOOP)
        .load(1, COUNTER_LOOP);
    let _ = ctx.run();

    for asid in 0..2 {
        let space = ctx.sim.address_space(asid).unwrap();
        assert_eq!(space.read_u64(DATA_BASE).unwrap(), 20);
    }
    assert!(ctx.sim.memory().directory_violations().is_empty());
    assert_eq!(ctx.sim.memory().in_flight(), 0);
}

#[test]
fn smt_threads_on_one_core_share_its_caches() {
    let mut ctx = TestContext::with_config(small_config(1, 2))
        .shared_address_space()
        .load(0, COUNTER_LOOP)
        .load(1, COUNTER_LOOP);
    let stats = ctx.run();

    assert_eq!(stats.committed, 2 * COUNTER_LOOP_COMMITS);
    let l1d = ctx.sim.memory().l1_data(0);
    let l1d_stats = ctx.sim.memory().cache_stats(l1d).unwrap();
    assert_eq!(l1d_stats.invalidations, 0);
    assert!(ctx.sim.memory().directory_violations().is_empty());
}
