//! Simulator: owns the cores, the memory system, and the guest address spaces.
//!
//! Components refer to each other only by index, so one `tick` can lend the
//! shared pieces to each core in turn through a `CycleContext` instead of
//! storing back-references. A cycle runs in a fixed order:
//! 1. **Cores:** Every core runs its pipeline stages, in core-index order.
//! 2. **Memory:** The memory system runs its due protocol events.
//! 3. **Callbacks:** Finished accesses go back to their cores, then each core
//!    runs its due functional unit events.

use std::time::Instant;

use tracing::{debug, info};

use crate::coherence::MemorySystem;
use crate::common::constants::{DATA_BASE, DATA_SIZE};
use crate::common::{RegClass, SimError, SimResult};
use crate::config::Config;
use crate::core::{Core, Thread};
use crate::isa::InstructionSet;
use crate::isa::mini::{MiniIsa, Program};
use crate::mem::{Memory, Mmu};
use crate::stats::{CacheReport, SimStats, ThreadReport};

/// Shared state lent to a core for one cycle.
#[derive(Debug)]
pub struct CycleContext<'a> {
    /// Current global cycle.
    pub cycle: u64,
    /// The coherent memory hierarchy.
    pub memory: &'a mut MemorySystem,
    /// Address translation.
    pub mmu: &'a mut Mmu,
    /// Guest memory images, indexed by address space.
    pub spaces: &'a mut [Memory],
    /// Decode and execute semantics.
    pub isa: &'a dyn InstructionSet,
}

/// How `run` ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every thread halted and the memory system drained.
    Finished {
        /// Cycles simulated.
        cycles: u64,
    },
    /// `max_cycles` elapsed first.
    CycleLimit {
        /// Cycles simulated.
        cycles: u64,
    },
}

/// The simulated processor.
#[derive(Debug)]
pub struct Simulator {
    config: Config,
    isa: Box<dyn InstructionSet>,
    cores: Vec<Core>,
    memory: MemorySystem,
    mmu: Mmu,
    spaces: Vec<Memory>,
    cycle: u64,
    host_seconds: f64,
}

impl Simulator {
    /// Builds a processor from `config`.
    ///
    /// Each hardware thread gets its own empty address space; threads stay idle
    /// until a program is loaded for them.
    pub fn new(config: Config, isa: Box<dyn InstructionSet>) -> SimResult<Self> {
        config.validate()?;
        let p = &config.processor;
        for (class, phys) in RegClass::ALL
            .into_iter()
            .zip([p.phys_int_regs, p.phys_fp_regs, p.phys_misc_regs])
        {
            let arch = isa.register_count(class);
            if phys <= arch {
                return Err(SimError::InvalidConfig(format!(
                    "{phys} physical {class} registers cannot rename {arch} architectural ones"
                )));
            }
        }

        let memory = MemorySystem::new(&config.memory, p.num_cores, config.general.seed);
        let cores = (0..p.num_cores)
            .map(|c| Core::new(c, &config, isa.as_ref(), memory.ports(c)))
            .collect::<SimResult<Vec<_>>>()?;
        let mmu = Mmu::new(config.memory.page_size, config.memory.mmu_buckets);
        let spaces = vec![Memory::new(); config.total_threads()];
        debug!(
            cores = p.num_cores,
            threads_per_core = p.threads_per_core,
            "simulator built"
        );
        Ok(Self {
            config,
            isa,
            cores,
            memory,
            mmu,
            spaces,
            cycle: 0,
            host_seconds: 0.0,
        })
    }

    /// Builds a processor running the mini ISA.
    pub fn with_mini_isa(config: Config) -> SimResult<Self> {
        Self::new(config, Box::new(MiniIsa::new()))
    }

    fn locate(&self, thread: usize) -> SimResult<(usize, usize)> {
        let tpc = self.config.processor.threads_per_core;
        if thread >= self.config.total_threads() {
            return Err(SimError::InvalidConfig(format!("no hardware thread {thread}")));
        }
        Ok((thread / tpc, thread % tpc))
    }

    /// Loads `program` for global thread `thread` and starts it at the entry point.
    ///
    /// The data region `[DATA_BASE, DATA_BASE + DATA_SIZE)` of the thread's
    /// address space is mapped as well.
    pub fn load_program(&mut self, thread: usize, program: &Program) -> SimResult<()> {
        let (c, t) = self.locate(thread)?;
        let hart = &mut self.cores[c].threads[t];
        let space = &mut self.spaces[hart.asid as usize];
        program.load_into(space)?;
        space.map(DATA_BASE, DATA_SIZE);
        hart.start(program.entry());
        info!(thread, entry = program.entry(), words = program.words.len(), "program loaded");
        Ok(())
    }

    /// Guest memory of address space `asid`, for seeding data.
    pub fn address_space_mut(&mut self, asid: usize) -> Option<&mut Memory> {
        self.spaces.get_mut(asid)
    }

    /// Guest memory of address space `asid`.
    pub fn address_space(&self, asid: usize) -> Option<&Memory> {
        self.spaces.get(asid)
    }

    /// Moves global thread `thread` into address space `asid`.
    ///
    /// Threads sharing an address space share guest memory and physical pages.
    pub fn set_address_space(&mut self, thread: usize, asid: usize) -> SimResult<()> {
        let (c, t) = self.locate(thread)?;
        if asid >= self.spaces.len() {
            return Err(SimError::InvalidConfig(format!("no address space {asid}")));
        }
        self.cores[c].threads[t].asid = asid as u32;
        Ok(())
    }

    /// Advances the whole processor by one cycle.
    pub fn tick(&mut self) -> SimResult<()> {
        let mut ctx = CycleContext {
            cycle: self.cycle,
            memory: &mut self.memory,
            mmu: &mut self.mmu,
            spaces: &mut self.spaces,
            isa: self.isa.as_ref(),
        };
        for core in &mut self.cores {
            core.advance_one_cycle(&mut ctx)?;
        }

        self.memory.advance_one_cycle();
        for done in self.memory.drain_completions() {
            if let Some(core) = self.cores.get_mut(done.core) {
                core.on_access_complete(done.tag);
            }
        }
        for core in &mut self.cores {
            core.drain_events();
        }
        self.cycle += 1;
        Ok(())
    }

    /// Ticks until every thread finishes or `max_cycles` is reached.
    ///
    /// # Returns
    ///
    /// How the run ended, or the first fatal error (such as a commit timeout).
    pub fn run(&mut self) -> SimResult<RunOutcome> {
        let start = Instant::now();
        let limit = self.config.general.max_cycles;
        let result = loop {
            if self.is_finished() {
                break Ok(RunOutcome::Finished { cycles: self.cycle });
            }
            if self.cycle >= limit {
                break Ok(RunOutcome::CycleLimit { cycles: self.cycle });
            }
            if let Err(e) = self.tick() {
                break Err(e);
            }
        };
        self.host_seconds += start.elapsed().as_secs_f64();
        info!(cycles = self.cycle, seconds = self.host_seconds, "run ended");
        result
    }

    /// Every thread has halted and no memory transaction is in flight.
    pub fn is_finished(&self) -> bool {
        self.cores.iter().all(Core::is_finished) && self.memory.in_flight() == 0
    }

    /// Cycles simulated so far.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The configuration in use.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Core `id`.
    pub fn core(&self, id: usize) -> Option<&Core> {
        self.cores.get(id)
    }

    /// All cores.
    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    /// Global hardware thread `thread`.
    pub fn thread(&self, thread: usize) -> Option<&Thread> {
        let (c, t) = self.locate(thread).ok()?;
        self.cores.get(c)?.threads.get(t)
    }

    /// The memory system.
    pub const fn memory(&self) -> &MemorySystem {
        &self.memory
    }

    /// Mutable memory system, for injecting protocol requests.
    pub fn memory_mut(&mut self) -> &mut MemorySystem {
        &mut self.memory
    }

    /// Snapshot of every counter.
    pub fn stats(&self) -> SimStats {
        let threads: Vec<ThreadReport> = self
            .cores
            .iter()
            .flat_map(|core| {
                core.threads.iter().map(|t| ThreadReport {
                    core: core.id,
                    thread: t.id,
                    stats: t.stats,
                    predictor: t.predictor.stats,
                })
            })
            .collect();
        SimStats {
            host_seconds: self.host_seconds,
            cycles: self.cycle,
            committed: threads.iter().map(|t| t.stats.committed).sum(),
            fu_retries: self.cores.iter().map(|c| c.fu_pool.retries).sum(),
            threads,
            caches: self
                .memory
                .caches()
                .map(|(_, cache)| CacheReport {
                    name: cache.name.clone(),
                    stats: cache.stats,
                })
                .collect(),
            controller_accesses: self.memory.controller_accesses(),
            coalesced_loads: self.memory.coalesced_loads(),
        }
    }
}
