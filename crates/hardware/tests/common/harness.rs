//! Assembly-level simulation harness.

use mcsim_core::Simulator;
use mcsim_core::common::SimError;
use mcsim_core::config::Config;
use mcsim_core::core::Thread;
use mcsim_core::isa::mini::assemble;
use mcsim_core::sim::RunOutcome;
use mcsim_core::stats::SimStats;

/// Routes `tracing` output through the test writer once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A configuration that keeps tests fast: short memory latency and a cycle cap.
pub fn small_config(cores: usize, threads_per_core: usize) -> Config {
    let mut config = Config::default();
    config.processor.num_cores = cores;
    config.processor.threads_per_core = threads_per_core;
    config.memory.controller_latency = 20;
    config.memory.l2.hit_latency = 4;
    config.general.max_cycles = 200_000;
    config.general.commit_timeout = 5_000;
    config
}

pub struct TestContext {
    pub sim: Simulator,
}

impl TestContext {
    /// One core, one thread.
    pub fn new() -> Self {
        Self::with_config(small_config(1, 1))
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let sim = Simulator::with_mini_isa(config).expect("valid test configuration");
        Self { sim }
    }

    /// Assembles `source` and starts it on global thread `thread`.
    pub fn load(mut self, thread: usize, source: &str) -> Self {
        let program = assemble(source).expect("test program assembles");
        self.sim.load_program(thread, &program).expect("program loads");
        self
    }

    /// Places every thread in address space 0.
    pub fn shared_address_space(mut self) -> Self {
        for t in 0..self.sim.config().total_threads() {
            self.sim.set_address_space(t, 0).expect("address space exists");
        }
        self
    }

    /// Runs to completion, panicking if the cycle cap is hit.
    pub fn run(&mut self) -> SimStats {
        match self.sim.run() {
            Ok(RunOutcome::Finished { .. }) => self.sim.stats(),
            Ok(RunOutcome::CycleLimit { cycles }) => panic!("program did not finish in {cycles} cycles"),
            Err(e) => panic!("simulation failed: {e}"),
        }
    }

    /// Runs and returns the error that stopped the simulation.
    pub fn run_err(&mut self) -> SimError {
        match self.sim.run() {
            Err(e) => e,
            Ok(outcome) => panic!("expected an error, got {outcome:?}"),
        }
    }

    pub fn thread(&self, thread: usize) -> &Thread {
        self.sim.thread(thread).expect("thread exists")
    }

    /// Architectural value of integer register `r` of `thread`.
    pub fn reg(&self, thread: usize, r: usize) -> u64 {
        self.thread(thread).state.int[r]
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
