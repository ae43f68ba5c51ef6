//! Run control, statistics, and simulator construction errors.

use mcsim_core::Simulator;
use mcsim_core::common::SimError;
use mcsim_core::isa::mini::assemble;
use mcsim_core::sim::RunOutcome;
use pretty_assertions::assert_eq;

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

#[test]
fn cycle_limit_stops_the_run() {
    let mut config = small_config(1, 1);
    config.general.max_cycles = 10;
    let mut ctx = TestContext::with_config(config).load(0, SUM_LOOP);

    assert_eq!(ctx.sim.run().unwrap(), RunOutcome::CycleLimit { cycles: 10 });
    assert!(!ctx.sim.is_finished());
}

#[test]
fn empty_processor_finishes_immediately() {
    let mut sim = Simulator::with_mini_isa(small_config(2, 2)).unwrap();
    assert_eq!(sim.run().unwrap(), RunOutcome::Finished { cycles: 0 });
}

#[test]
fn ipc_counts_every_thread() {
    let mut ctx = TestContext::with_config(small_config(1, 2))
        .load(0, SUM_LOOP)
        .load(1, SUM_LOOP);
    let stats = ctx.run();

    assert_eq!(stats.committed, 66);
    assert_eq!(stats.cycles, ctx.sim.cycle());
    let expected = 66.0 / stats.cycles as f64;
    assert!((stats.ipc() - expected).abs() < 1e-12);
    let width = ctx.sim.config().processor.commit_width as f64;
    assert!(stats.ipc() <= width * 2.0);
    let l1i = ctx.sim.memory().l1_instruction(0);
    let fetches = ctx.sim.memory().cache_stats(l1i).unwrap();
    assert!(fetches.accesses > 0);
    assert_eq!(fetches.writes, 0);
}

#[test]
fn stats_serialize_to_json() {
    let mut ctx = TestContext::new().load(0, SUM_LOOP);
    let stats = ctx.run();
    let json = serde_json::to_value(&stats).unwrap();

    assert_eq!(json["committed"], 33);
    assert_eq!(json["threads"][0]["stats"]["branches"], 10);
    let mut names: Vec<&str> = json["caches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["l1d0", "l1i0", "l2"]);
    assert!(json["controller_accesses"].as_u64().unwrap() > 0);
}

#[test]
fn too_few_physical_registers_is_rejected() {
    let mut config = small_config(1, 1);
    config.processor.phys_int_regs = 32;
    match Simulator::with_mini_isa(config) {
        Err(SimError::InvalidConfig(message)) => assert!(message.contains("32")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn loading_an_unknown_thread_fails() {
    let mut sim = Simulator::with_mini_isa(small_config(1, 2)).unwrap();
    let program = assemble("halt").unwrap();
    assert!(sim.load_program(2, &program).is_err());
    assert!(sim.load_program(1, &program).is_ok());
    assert!(sim.set_address_space(0, 5).is_err());
}

#[test]
fn fetch_of_unmapped_code_is_an_error() {
    let mut ctx = TestContext::new().load(0, "j 0x4000\nhalt");
    let err = ctx.run_err();
    assert!(matches!(err, SimError::UnmappedAddress(addr) if addr >= 0x1_1000), "{err}");
}
