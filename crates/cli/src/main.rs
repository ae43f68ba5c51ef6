//! Multicore out-of-order simulator CLI.
//!
//! This binary wraps the simulator library with two subcommands:
//! 1. **Run:** Assemble one mini-ISA program per hardware thread, simulate until every
//!    thread halts (or the cycle cap is hit), and print the statistics report.
//! 2. **Config:** Print the default configuration as JSON, as a starting point for `--config`.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcsim_core::config::Config;
use mcsim_core::isa::mini::assemble;
use mcsim_core::sim::RunOutcome;
use mcsim_core::stats::STATS_SECTIONS;
use mcsim_core::{SimError, SimResult, Simulator};

#[derive(Parser, Debug)]
#[command(
    name = "mcsim",
    author,
    version,
    about = "Cycle-level multicore, multithreaded out-of-order simulator",
    long_about = "Simulate mini-ISA programs on an SMT out-of-order multicore with a directory MESI hierarchy.\n\nPrograms are assigned to hardware threads in order: the first --program runs on thread 0\n(core 0), the next on thread 1, and so on. Threads without a program stay idle.\n\nExamples:\n  mcsim run -p demos/sum.s\n  mcsim run -c cfg.json -p demos/counter.s -p demos/counter.s --shared-memory\n  mcsim config > cfg.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one or more assembly programs.
    Run {
        /// JSON configuration file (defaults for every missing field).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Assembly program for the next hardware thread (repeatable).
        #[arg(short, long = "program", required = true)]
        programs: Vec<PathBuf>,

        /// Override `general.max_cycles`.
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Put every thread in address space 0 so they share memory.
        #[arg(long)]
        shared_memory: bool,

        /// Report sections to print (summary, threads, branch, memory).
        #[arg(long, num_args = 1.., value_parser = clap::builder::PossibleValuesParser::new(STATS_SECTIONS.iter().copied()))]
        stats: Vec<String>,

        /// Print statistics as JSON instead of the text report.
        #[arg(long)]
        json: bool,

        /// Log every pipeline and protocol event.
        #[arg(long)]
        trace: bool,
    },

    /// Print the default configuration as JSON.
    Config,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            programs,
            max_cycles,
            shared_memory,
            stats,
            json,
            trace,
        } => {
            init_tracing(trace);
            let opts = RunOptions {
                max_cycles,
                shared_memory,
                stats,
                json,
            };
            cmd_run(config.as_deref(), &programs, &opts)
        }
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

/// Installs the global subscriber; `RUST_LOG` wins unless `--trace` is given.
fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct RunOptions {
    max_cycles: Option<u64>,
    shared_memory: bool,
    stats: Vec<String>,
    json: bool,
}

fn load_config(path: Option<&Path>) -> SimResult<Config> {
    match path {
        Some(path) => Config::from_json(&fs::read_to_string(path)?),
        None => Ok(Config::default()),
    }
}

/// Builds the processor, loads every program, and runs to completion.
fn cmd_run(config_path: Option<&Path>, programs: &[PathBuf], opts: &RunOptions) -> SimResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(max) = opts.max_cycles {
        config.general.max_cycles = max;
    }
    let threads = config.total_threads();
    if programs.len() > threads {
        return Err(SimError::InvalidConfig(format!(
            "{} programs given but the processor has {threads} hardware threads",
            programs.len()
        )));
    }

    let mut sim = Simulator::with_mini_isa(config)?;
    if opts.shared_memory {
        for t in 0..threads {
            sim.set_address_space(t, 0)?;
        }
    }
    for (thread, path) in programs.iter().enumerate() {
        let program = assemble(&fs::read_to_string(path)?)?;
        sim.load_program(thread, &program)?;
        info!(thread, path = %path.display(), "assigned program");
    }

    let outcome = sim.run();
    let stats = sim.stats();
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print_sections(&opts.stats);
    }

    match outcome? {
        RunOutcome::Finished { cycles } => {
            if !opts.json {
                println!("[*] All threads halted after {cycles} cycles");
            }
            Ok(())
        }
        RunOutcome::CycleLimit { cycles } => Err(SimError::InvalidConfig(format!(
            "cycle limit reached after {cycles} cycles with threads still running"
        ))),
    }
}

fn cmd_config() -> SimResult<()> {
    println!("{}", serde_json::to_string_pretty(&Config::default())?);
    Ok(())
}
