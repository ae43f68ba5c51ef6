//! Configuration system for the simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline processor, predictor, and cache-hierarchy constants.
//! 2. **Structures:** Hierarchical config for general, processor, predictor, and memory settings.
//! 3. **Enums:** Functional unit kinds, replacement policies, and history combine modes.
//! 4. **Validation:** `Config::validate` rejects geometries the model cannot represent.
//!
//! Configuration is read once from JSON (or `Config::default()`) before the processor is built.

use serde::{Deserialize, Serialize};

use crate::common::{FuKind, SimError, SimResult};

/// Default configuration constants for the simulator.
///
/// These values define the baseline machine when a field is not
/// explicitly overridden in the JSON configuration.
mod defaults {
    /// Upper bound on simulated cycles before the run stops.
    pub const MAX_CYCLES: u64 = 10_000_000;

    /// Cycles a running thread may go without committing before the watchdog fires.
    pub const COMMIT_TIMEOUT: u64 = 100_000;

    /// Seed for the coherence retry-backoff generator.
    pub const SEED: u64 = 123_456_789;

    /// Number of cores sharing the L2.
    pub const NUM_CORES: usize = 2;

    /// Hardware threads per core.
    pub const THREADS_PER_CORE: usize = 2;

    /// Instructions renamed and dispatched per cycle.
    pub const DECODE_WIDTH: usize = 4;

    /// Instructions selected for execution per cycle.
    pub const ISSUE_WIDTH: usize = 4;

    /// Instructions retired per cycle.
    pub const COMMIT_WIDTH: usize = 4;

    /// Decode buffer capacity per thread.
    pub const DECODE_BUFFER_SIZE: usize = 32;

    /// Reorder buffer capacity per thread.
    pub const ROB_SIZE: usize = 96;

    /// Load/store queue capacity per thread.
    pub const LSQ_SIZE: usize = 48;

    /// Physical integer registers per thread.
    pub const PHYS_INT_REGS: usize = 128;

    /// Physical floating-point registers per thread.
    pub const PHYS_FP_REGS: usize = 128;

    /// Physical miscellaneous registers per thread.
    pub const PHYS_MISC_REGS: usize = 32;

    /// Backoff before a failed functional-unit acquisition is retried.
    pub const FU_RETRY_LATENCY: u64 = 10;

    /// Bimodal counter table size.
    pub const BIMODAL_SIZE: usize = 2048;

    /// Two-level first-level (history register) table size.
    pub const TWO_LEVEL_L1_SIZE: usize = 1;

    /// Two-level second-level (counter) table size.
    pub const TWO_LEVEL_L2_SIZE: usize = 1024;

    /// Two-level history length in bits.
    pub const TWO_LEVEL_HISTORY: u32 = 8;

    /// Meta-predictor table size.
    pub const CHOICE_SIZE: usize = 1024;

    /// BTB sets.
    pub const BTB_SETS: usize = 512;

    /// BTB associativity.
    pub const BTB_ASSOC: usize = 4;

    /// Return address stack depth.
    pub const RAS_SIZE: usize = 32;

    /// L1 sets.
    pub const L1_SETS: usize = 64;

    /// L1 associativity.
    pub const L1_ASSOC: usize = 4;

    /// L1 hit latency in cycles.
    pub const L1_HIT_LATENCY: u64 = 1;

    /// L2 sets.
    pub const L2_SETS: usize = 1024;

    /// L2 associativity.
    pub const L2_ASSOC: usize = 8;

    /// L2 hit latency in cycles.
    pub const L2_HIT_LATENCY: u64 = 10;

    /// Line size shared by every level (bytes).
    pub const LINE_SIZE: u64 = 64;

    /// Fixed memory-controller response latency.
    pub const CONTROLLER_LATENCY: u64 = 200;

    /// Cost of each cross-node coherence message.
    pub const MESSAGE_LATENCY: u64 = 2;

    /// MMU page size in bytes.
    pub const PAGE_SIZE: u64 = 4096;

    /// MMU hash-table bucket count.
    pub const MMU_BUCKETS: usize = 1024;
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use mcsim_core::config::{Config, ReplacementPolicy};
///
/// let json = r#"{
///     "processor": { "num_cores": 1, "threads_per_core": 1, "rob_size": 32 },
///     "memory": { "l2": { "sets": 256, "assoc": 4, "hit_latency": 12, "policy": "Random" } }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.processor.rob_size, 32);
/// assert_eq!(config.memory.l2.policy, ReplacementPolicy::Random);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Run limits and the watchdog.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Core and pipeline parameters.
    #[serde(default)]
    pub processor: ProcessorConfig,
    /// Branch predictor table geometry.
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// Cache hierarchy and memory latencies.
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses a JSON configuration and validates it.
    pub fn from_json(text: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Total hardware threads in the processor.
    pub const fn total_threads(&self) -> usize {
        self.processor.num_cores * self.processor.threads_per_core
    }

    /// Checks that every geometry and capacity can be modeled.
    pub fn validate(&self) -> SimResult<()> {
        let p = &self.processor;
        require(p.num_cores > 0, "num_cores must be at least 1")?;
        require(p.threads_per_core > 0, "threads_per_core must be at least 1")?;
        require(
            p.decode_width > 0 && p.issue_width > 0 && p.commit_width > 0,
            "pipeline widths must be at least 1",
        )?;
        require(
            p.decode_buffer_size > 0 && p.rob_size > 0 && p.lsq_size > 0,
            "queue capacities must be at least 1",
        )?;
        require(!p.functional_units.is_empty(), "functional_units is empty")?;
        for fu in &p.functional_units {
            require(fu.count > 0, "functional unit count must be at least 1")?;
        }
        require(p.fu_retry_latency > 0, "fu_retry_latency must be at least 1")?;
        require(self.general.commit_timeout > 0, "commit_timeout must be at least 1")?;

        let b = &self.predictor;
        power_of_two(b.bimodal_size, "predictor.bimodal_size")?;
        power_of_two(b.two_level.l1_size, "predictor.two_level.l1_size")?;
        power_of_two(b.two_level.l2_size, "predictor.two_level.l2_size")?;
        power_of_two(b.choice_size, "predictor.choice_size")?;
        power_of_two(b.btb_sets, "predictor.btb_sets")?;
        require(b.btb_assoc > 0, "predictor.btb_assoc must be at least 1")?;
        require(b.ras_size > 0, "predictor.ras_size must be at least 1")?;
        require(
            (1..=30).contains(&b.two_level.history_size),
            "predictor.two_level.history_size must be in 1..=30",
        )?;

        let m = &self.memory;
        for (name, cache) in [("l1_i", &m.l1_i), ("l1_d", &m.l1_d), ("l2", &m.l2)] {
            power_of_two(cache.sets, &format!("memory.{name}.sets"))?;
            require(cache.assoc > 0, &format!("memory.{name}.assoc must be at least 1"))?;
            require(
                cache.line_size.is_power_of_two() && cache.line_size >= 8,
                &format!("memory.{name}.line_size must be a power of two of at least 8"),
            )?;
            require(
                cache.hit_latency > 0,
                &format!("memory.{name}.hit_latency must be at least 1"),
            )?;
        }
        require(
            m.l1_i.line_size == m.l2.line_size && m.l1_d.line_size == m.l2.line_size,
            "all cache levels must share one line size",
        )?;
        require(
            m.page_size.is_power_of_two() && m.page_size >= m.l2.line_size,
            "memory.page_size must be a power of two no smaller than a line",
        )?;
        power_of_two(m.mmu_buckets, "memory.mmu_buckets")?;
        Ok(())
    }
}

fn require(condition: bool, message: &str) -> SimResult<()> {
    if condition {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(message.to_string()))
    }
}

fn power_of_two(value: usize, name: &str) -> SimResult<()> {
    require(value.is_power_of_two(), &format!("{name} must be a power of two"))
}

/// Run limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Stop after this many cycles even if threads are still running.
    #[serde(default = "GeneralConfig::default_max_cycles")]
    pub max_cycles: u64,

    /// Commit watchdog threshold in cycles.
    #[serde(default = "GeneralConfig::default_commit_timeout")]
    pub commit_timeout: u64,

    /// Seed for the coherence retry-backoff generator.
    #[serde(default = "GeneralConfig::default_seed")]
    pub seed: u64,
}

impl GeneralConfig {
    fn default_max_cycles() -> u64 {
        defaults::MAX_CYCLES
    }

    fn default_commit_timeout() -> u64 {
        defaults::COMMIT_TIMEOUT
    }

    fn default_seed() -> u64 {
        defaults::SEED
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_cycles: defaults::MAX_CYCLES,
            commit_timeout: defaults::COMMIT_TIMEOUT,
            seed: defaults::SEED,
        }
    }
}

/// One entry of the functional unit inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuConfig {
    /// Operation class served by these units.
    pub kind: FuKind,
    /// Number of identical units.
    pub count: usize,
    /// Cycles before the unit accepts the operation.
    pub issue_latency: u64,
    /// Cycles the operation takes once accepted.
    pub op_latency: u64,
}

impl FuConfig {
    const fn new(kind: FuKind, count: usize, issue_latency: u64, op_latency: u64) -> Self {
        Self {
            kind,
            count,
            issue_latency,
            op_latency,
        }
    }
}

/// Core and pipeline parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Number of cores.
    #[serde(default = "ProcessorConfig::default_num_cores")]
    pub num_cores: usize,

    /// Hardware threads per core.
    #[serde(default = "ProcessorConfig::default_threads_per_core")]
    pub threads_per_core: usize,

    /// Rename and dispatch width.
    #[serde(default = "ProcessorConfig::default_decode_width")]
    pub decode_width: usize,

    /// Selection width.
    #[serde(default = "ProcessorConfig::default_issue_width")]
    pub issue_width: usize,

    /// Commit width.
    #[serde(default = "ProcessorConfig::default_commit_width")]
    pub commit_width: usize,

    /// Decode buffer capacity per thread.
    #[serde(default = "ProcessorConfig::default_decode_buffer_size")]
    pub decode_buffer_size: usize,

    /// Reorder buffer capacity per thread.
    #[serde(default = "ProcessorConfig::default_rob_size")]
    pub rob_size: usize,

    /// Load/store queue capacity per thread.
    #[serde(default = "ProcessorConfig::default_lsq_size")]
    pub lsq_size: usize,

    /// Physical integer registers per thread.
    #[serde(default = "ProcessorConfig::default_phys_int_regs")]
    pub phys_int_regs: usize,

    /// Physical floating-point registers per thread.
    #[serde(default = "ProcessorConfig::default_phys_fp_regs")]
    pub phys_fp_regs: usize,

    /// Physical miscellaneous registers per thread.
    #[serde(default = "ProcessorConfig::default_phys_misc_regs")]
    pub phys_misc_regs: usize,

    /// Delay before a failed functional-unit acquisition is retried.
    #[serde(default = "ProcessorConfig::default_fu_retry_latency")]
    pub fu_retry_latency: u64,

    /// Functional unit inventory of each core.
    #[serde(default = "ProcessorConfig::default_functional_units")]
    pub functional_units: Vec<FuConfig>,
}

impl ProcessorConfig {
    fn default_num_cores() -> usize {
        defaults::NUM_CORES
    }

    fn default_threads_per_core() -> usize {
        defaults::THREADS_PER_CORE
    }

    fn default_decode_width() -> usize {
        defaults::DECODE_WIDTH
    }

    fn default_issue_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    fn default_commit_width() -> usize {
        defaults::COMMIT_WIDTH
    }

    fn default_decode_buffer_size() -> usize {
        defaults::DECODE_BUFFER_SIZE
    }

    fn default_rob_size() -> usize {
        defaults::ROB_SIZE
    }

    fn default_lsq_size() -> usize {
        defaults::LSQ_SIZE
    }

    fn default_phys_int_regs() -> usize {
        defaults::PHYS_INT_REGS
    }

    fn default_phys_fp_regs() -> usize {
        defaults::PHYS_FP_REGS
    }

    fn default_phys_misc_regs() -> usize {
        defaults::PHYS_MISC_REGS
    }

    fn default_fu_retry_latency() -> u64 {
        defaults::FU_RETRY_LATENCY
    }

    /// The default unit inventory: four ALUs, one multiplier and divider,
    /// two FP adders, one FP multiplier and divider, two read and two write ports.
    pub fn default_functional_units() -> Vec<FuConfig> {
        vec![
            FuConfig::new(FuKind::IntAlu, 4, 1, 1),
            FuConfig::new(FuKind::IntMult, 1, 1, 3),
            FuConfig::new(FuKind::IntDiv, 1, 19, 20),
            FuConfig::new(FuKind::FpAdd, 2, 1, 2),
            FuConfig::new(FuKind::FpMult, 1, 1, 4),
            FuConfig::new(FuKind::FpDiv, 1, 12, 12),
            FuConfig::new(FuKind::ReadPort, 2, 1, 1),
            FuConfig::new(FuKind::WritePort, 2, 1, 1),
        ]
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            num_cores: defaults::NUM_CORES,
            threads_per_core: defaults::THREADS_PER_CORE,
            decode_width: defaults::DECODE_WIDTH,
            issue_width: defaults::ISSUE_WIDTH,
            commit_width: defaults::COMMIT_WIDTH,
            decode_buffer_size: defaults::DECODE_BUFFER_SIZE,
            rob_size: defaults::ROB_SIZE,
            lsq_size: defaults::LSQ_SIZE,
            phys_int_regs: defaults::PHYS_INT_REGS,
            phys_fp_regs: defaults::PHYS_FP_REGS,
            phys_misc_regs: defaults::PHYS_MISC_REGS,
            fu_retry_latency: defaults::FU_RETRY_LATENCY,
            functional_units: Self::default_functional_units(),
        }
    }
}

/// How the two-level predictor folds history into the counter index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryCombine {
    /// `history ^ (addr >> BRANCH_SHIFT)` (gshare-style).
    #[default]
    Xor,
    /// `(addr >> BRANCH_SHIFT) << history_size | history`.
    Concat,
}

/// Two-level adaptive predictor geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoLevelConfig {
    /// Number of history shift registers.
    #[serde(default = "TwoLevelConfig::default_l1_size")]
    pub l1_size: usize,

    /// Number of 2-bit counters.
    #[serde(default = "TwoLevelConfig::default_l2_size")]
    pub l2_size: usize,

    /// History length in bits.
    #[serde(default = "TwoLevelConfig::default_history_size")]
    pub history_size: u32,

    /// History/address combine mode.
    #[serde(default)]
    pub combine: HistoryCombine,
}

impl TwoLevelConfig {
    fn default_l1_size() -> usize {
        defaults::TWO_LEVEL_L1_SIZE
    }

    fn default_l2_size() -> usize {
        defaults::TWO_LEVEL_L2_SIZE
    }

    fn default_history_size() -> u32 {
        defaults::TWO_LEVEL_HISTORY
    }
}

impl Default for TwoLevelConfig {
    fn default() -> Self {
        Self {
            l1_size: defaults::TWO_LEVEL_L1_SIZE,
            l2_size: defaults::TWO_LEVEL_L2_SIZE,
            history_size: defaults::TWO_LEVEL_HISTORY,
            combine: HistoryCombine::Xor,
        }
    }
}

/// Combined branch predictor geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Bimodal table size.
    #[serde(default = "PredictorConfig::default_bimodal_size")]
    pub bimodal_size: usize,

    /// Two-level table geometry.
    #[serde(default)]
    pub two_level: TwoLevelConfig,

    /// Meta-predictor table size.
    #[serde(default = "PredictorConfig::default_choice_size")]
    pub choice_size: usize,

    /// BTB sets.
    #[serde(default = "PredictorConfig::default_btb_sets")]
    pub btb_sets: usize,

    /// BTB ways per set.
    #[serde(default = "PredictorConfig::default_btb_assoc")]
    pub btb_assoc: usize,

    /// Return address stack entries.
    #[serde(default = "PredictorConfig::default_ras_size")]
    pub ras_size: usize,
}

impl PredictorConfig {
    fn default_bimodal_size() -> usize {
        defaults::BIMODAL_SIZE
    }

    fn default_choice_size() -> usize {
        defaults::CHOICE_SIZE
    }

    fn default_btb_sets() -> usize {
        defaults::BTB_SETS
    }

    fn default_btb_assoc() -> usize {
        defaults::BTB_ASSOC
    }

    fn default_ras_size() -> usize {
        defaults::RAS_SIZE
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            bimodal_size: defaults::BIMODAL_SIZE,
            two_level: TwoLevelConfig::default(),
            choice_size: defaults::CHOICE_SIZE,
            btb_sets: defaults::BTB_SETS,
            btb_assoc: defaults::BTB_ASSOC,
            ras_size: defaults::RAS_SIZE,
        }
    }
}

/// Victim selection policy of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementPolicy {
    /// Invalid ways first, then the least recently accessed way.
    #[default]
    Lru,
    /// Invalid ways first, then a pseudo-random way.
    Random,
}

/// Geometry and timing of one cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of sets.
    pub sets: usize,

    /// Ways per set.
    pub assoc: usize,

    /// Line size in bytes.
    #[serde(default = "CacheConfig::default_line_size")]
    pub line_size: u64,

    /// Lookup latency in cycles.
    pub hit_latency: u64,

    /// Victim selection policy.
    #[serde(default)]
    pub policy: ReplacementPolicy,
}

impl CacheConfig {
    fn default_line_size() -> u64 {
        defaults::LINE_SIZE
    }

    fn l1() -> Self {
        Self {
            sets: defaults::L1_SETS,
            assoc: defaults::L1_ASSOC,
            line_size: defaults::LINE_SIZE,
            hit_latency: defaults::L1_HIT_LATENCY,
            policy: ReplacementPolicy::Lru,
        }
    }

    fn l2() -> Self {
        Self {
            sets: defaults::L2_SETS,
            assoc: defaults::L2_ASSOC,
            line_size: defaults::LINE_SIZE,
            hit_latency: defaults::L2_HIT_LATENCY,
            policy: ReplacementPolicy::Lru,
        }
    }

    /// Total capacity in bytes.
    pub const fn size_bytes(&self) -> u64 {
        self.sets as u64 * self.assoc as u64 * self.line_size
    }
}

/// Cache hierarchy, coherence latencies, and address translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Private L1 instruction cache (one per core).
    #[serde(default = "MemoryConfig::default_l1")]
    pub l1_i: CacheConfig,

    /// Private L1 data cache (one per core).
    #[serde(default = "MemoryConfig::default_l1")]
    pub l1_d: CacheConfig,

    /// Shared L2.
    #[serde(default = "MemoryConfig::default_l2")]
    pub l2: CacheConfig,

    /// Memory controller response latency.
    #[serde(default = "MemoryConfig::default_controller_latency")]
    pub controller_latency: u64,

    /// Cost of each cross-node coherence request.
    #[serde(default = "MemoryConfig::default_message_latency")]
    pub message_latency: u64,

    /// MMU page size.
    #[serde(default = "MemoryConfig::default_page_size")]
    pub page_size: u64,

    /// MMU hash buckets.
    #[serde(default = "MemoryConfig::default_mmu_buckets")]
    pub mmu_buckets: usize,
}

impl MemoryConfig {
    fn default_l1() -> CacheConfig {
        CacheConfig::l1()
    }

    fn default_l2() -> CacheConfig {
        CacheConfig::l2()
    }

    fn default_controller_latency() -> u64 {
        defaults::CONTROLLER_LATENCY
    }

    fn default_message_latency() -> u64 {
        defaults::MESSAGE_LATENCY
    }

    fn default_page_size() -> u64 {
        defaults::PAGE_SIZE
    }

    fn default_mmu_buckets() -> usize {
        defaults::MMU_BUCKETS
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::l1(),
            l1_d: CacheConfig::l1(),
            l2: CacheConfig::l2(),
            controller_latency: defaults::CONTROLLER_LATENCY,
            message_latency: defaults::MESSAGE_LATENCY,
            page_size: defaults::PAGE_SIZE,
            mmu_buckets: defaults::MMU_BUCKETS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_rejects_non_power_of_two_sets() {
        let mut config = Config::default();
        config.memory.l1_d.sets = 48;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_mismatched_line_sizes() {
        let mut config = Config::default();
        config.memory.l1_i.line_size = 32;
        assert!(config.validate().is_err());
    }
}
