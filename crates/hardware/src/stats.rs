//! Simulation statistics collection and reporting.
//!
//! Counters live next to the component that increments them:
//! 1. **`CacheStats`:** Per coherent cache, updated by the protocol engine.
//! 2. **`ThreadStats`:** Per hardware thread, updated by the pipeline stages.
//! 3. **`SimStats`:** A snapshot assembled by the simulator for reporting, with
//!    derived IPC, a text report, and JSON serialization.

use serde::Serialize;

use crate::core::units::bru::PredictorStats;

/// Counters of one coherent cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups (retried lookups are not counted again).
    pub accesses: u64,
    /// Lookups that found the block.
    pub hits: u64,
    /// Valid blocks replaced.
    pub evictions: u64,
    /// Read lookups.
    pub reads: u64,
    /// Write lookups.
    pub writes: u64,
    /// Loads retried after the next level failed.
    pub read_retries: u64,
    /// Stores retried after the next level failed.
    pub write_retries: u64,
    /// Blocks invalidated by a down-up write.
    pub invalidations: u64,
    /// Dirty data written back (on demotion, invalidation, or sharing).
    pub writebacks: u64,
}

impl CacheStats {
    /// Fraction of lookups that missed.
    pub fn miss_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            (self.accesses - self.hits) as f64 / self.accesses as f64
        }
    }
}

/// Counters of one hardware thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ThreadStats {
    /// Instructions placed in the decode buffer.
    pub fetched: u64,
    /// Instructions committed.
    pub committed: u64,
    /// In-flight instructions discarded by recovery.
    pub squashed: u64,
    /// Control instructions committed.
    pub branches: u64,
    /// Committed control instructions whose next PC was mispredicted.
    pub mispredictions: u64,
    /// Loads committed.
    pub loads: u64,
    /// Stores committed.
    pub stores: u64,
    /// Loads satisfied from an older in-flight store.
    pub forwarded_loads: u64,
    /// Rename attempts stalled on a full buffer or register file.
    pub rename_stalls: u64,
}

/// Report entry for one thread.
#[derive(Clone, Debug, Serialize)]
pub struct ThreadReport {
    /// Core index.
    pub core: usize,
    /// Thread index within the core.
    pub thread: usize,
    /// Pipeline counters.
    pub stats: ThreadStats,
    /// Branch predictor counters.
    pub predictor: PredictorStats,
}

/// Report entry for one cache.
#[derive(Clone, Debug, Serialize)]
pub struct CacheReport {
    /// Cache name.
    pub name: String,
    /// Counters.
    pub stats: CacheStats,
}

/// Snapshot of a whole simulation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimStats {
    /// Wall-clock seconds spent simulating.
    pub host_seconds: f64,
    /// Simulated cycles.
    pub cycles: u64,
    /// Instructions committed by every thread.
    pub committed: u64,
    /// Functional unit acquisitions that had to retry, over all cores.
    pub fu_retries: u64,
    /// Per-thread counters.
    pub threads: Vec<ThreadReport>,
    /// Per-cache counters.
    pub caches: Vec<CacheReport>,
    /// Requests served by main memory.
    pub controller_accesses: u64,
    /// Loads merged into an outstanding load of the same block.
    pub coalesced_loads: u64,
}

/// Section names accepted by `print_sections`.
pub const STATS_SECTIONS: &[&str] = &["summary", "threads", "branch", "memory"];

impl SimStats {
    /// Committed instructions per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.committed as f64 / self.cycles as f64
        }
    }

    /// Prints the named sections (all when `sections` is empty).
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            let khz = if self.host_seconds > 0.0 {
                (self.cycles as f64 / self.host_seconds) / 1000.0
            } else {
                0.0
            };
            println!("\n==========================================================");
            println!("MULTICORE SIMULATION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {:.4} s", self.host_seconds);
            println!("sim_cycles               {}", self.cycles);
            println!("sim_freq                 {khz:.2} kHz");
            println!("sim_insts                {}", self.committed);
            println!("sim_ipc                  {:.4}", self.ipc());
            println!("fu_retries               {}", self.fu_retries);
            println!("----------------------------------------------------------");
        }
        if want("threads") {
            println!("THREADS");
            for t in &self.threads {
                let s = &t.stats;
                println!(
                    "  c{}t{}  committed: {:<10} fetched: {:<10} squashed: {:<8} loads: {:<8} stores: {:<8} fwd: {:<6} rename_stalls: {}",
                    t.core,
                    t.thread,
                    s.committed,
                    s.fetched,
                    s.squashed,
                    s.loads,
                    s.stores,
                    s.forwarded_loads,
                    s.rename_stalls
                );
            }
            println!("----------------------------------------------------------");
        }
        if want("branch") {
            println!("BRANCH PREDICTION");
            for t in &self.threads {
                let s = &t.stats;
                let acc = if s.branches > 0 {
                    100.0 * (s.branches - s.mispredictions) as f64 / s.branches as f64
                } else {
                    0.0
                };
                println!(
                    "  c{}t{}  branches: {:<10} mispredicts: {:<8} accuracy: {acc:.2}%  recoveries: {}",
                    t.core, t.thread, s.branches, s.mispredictions, t.predictor.recoveries
                );
            }
            println!("----------------------------------------------------------");
        }
        if want("memory") {
            println!("MEMORY HIERARCHY");
            for c in &self.caches {
                let s = &c.stats;
                println!(
                    "  {:<6} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}% | evict: {:<6} | inval: {:<6} | wb: {:<6} | retries: {}/{}",
                    c.name,
                    s.accesses,
                    s.hits,
                    s.miss_rate() * 100.0,
                    s.evictions,
                    s.invalidations,
                    s.writebacks,
                    s.read_retries,
                    s.write_retries
                );
            }
            println!("  mem    accesses: {}", self.controller_accesses);
            println!("  coalesced loads: {}", self.coalesced_loads);
        }
        println!("==========================================================");
    }

    /// Prints every section.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_of_empty_run_is_zero() {
        assert_eq!(SimStats::default().ipc(), 0.0);
    }

    #[test]
    fn test_miss_rate() {
        let s = CacheStats {
            accesses: 4,
            hits: 3,
            ..CacheStats::default()
        };
        assert!((s.miss_rate() - 0.25).abs() < f64::EPSILON);
    }
}
