//! Cogsynth - cognitive synthesis engine harness
//!
//! Usage:
//!   cogsynth run --scenario all --events 500 --cycles 3 --seed 42 --out results
//!   cogsynth run --scenario symmetric_jumps --seeds seeds.toml --config engine.toml
//!   cogsynth --dump-config > engine.toml
//!
//! Each scenario gets its own engine. Per cycle the posteriori cache is
//! cleared, events are fed in order and the cycle's records and stats are
//! written as JSONL/JSON. A master summary closes the run.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cogsynth::{JsonlSink, Scenario, ScenarioKind};
use cogsynth_core::{EngineConfig, LogicSeeds};
use cogsynth_engine::{Clock, CycleOrchestrator, Engine, MonotonicClock, StepClock};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cogsynth", about = "Cognitive synthesis engine: guard, habit and intuition over a stimulus stream")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Dump default config as TOML and exit.
    #[arg(long)]
    dump_config: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run scenarios through the engine and write results.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Scenario name, or "all".
    #[arg(long, default_value = "all")]
    scenario: String,

    /// Events per cycle. Default: from config.
    #[arg(long)]
    events: Option<usize>,

    /// Cycles per scenario. Default: from config.
    #[arg(long)]
    cycles: Option<usize>,

    /// Seed for randomized scenarios.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Events between mirrored jumps in symmetric_jumps.
    #[arg(long, default_value_t = cogsynth::scenario::DEFAULT_JUMP_INTERVAL)]
    jump_interval: usize,

    /// Engine config (TOML). Default: built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logic seed file (TOML or JSON): constraint rules and apriori knowledge.
    #[arg(long)]
    seeds: Option<PathBuf>,

    /// Output directory for result files.
    #[arg(long, default_value = "results")]
    out: PathBuf,

    /// Measure latency with a fixed-step clock so runs are byte-identical.
    #[arg(long)]
    deterministic: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        println!("{}", EngineConfig::default().to_toml());
        return Ok(());
    }

    init_tracing(cli.json_logs);

    match cli.command {
        Some(Command::Run(args)) => run(args),
        None => {
            anyhow::bail!("nothing to do: use `cogsynth run` or `cogsynth --dump-config`")
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cogsynth=info,cogsynth_engine=info,cogsynth_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(events) = args.events {
        config.cycle.events_per_cycle = events;
    }
    if let Some(cycles) = args.cycles {
        config.cycle.cycles = cycles;
    }
    config.validate()?;

    let seeds = match &args.seeds {
        Some(path) => LogicSeeds::load(path)?,
        None => LogicSeeds::default(),
    };

    let scenarios: Vec<ScenarioKind> = if args.scenario.eq_ignore_ascii_case("all") {
        ScenarioKind::ALL.to_vec()
    } else {
        vec![args.scenario.parse().map_err(anyhow::Error::msg)?]
    };

    let run_id = Uuid::new_v4();
    let mut sink = JsonlSink::new(&args.out)
        .with_context(|| format!("preparing output directory {}", args.out.display()))?;
    let orchestrator = CycleOrchestrator::new(&config.cycle);

    info!(
        "Run {}: {} scenario(s) × {} cycles × {} events, seed {}",
        run_id,
        scenarios.len(),
        config.cycle.cycles,
        config.cycle.events_per_cycle,
        args.seed
    );

    for kind in scenarios {
        let clock: Box<dyn Clock> = if args.deterministic {
            Box::new(StepClock::new(Duration::from_micros(1)))
        } else {
            Box::new(MonotonicClock::new())
        };
        // One engine per stream: nothing learned in one scenario leaks into
        // another.
        let mut engine = Engine::with_seeds(config.clone(), &seeds, clock)?;
        let mut source = Scenario::new(kind, args.seed).with_jump_interval(args.jump_interval);

        let stats = orchestrator.run(&mut engine, &mut source, &mut sink)?;
        let status = engine.status();
        info!(
            "{} done: {} cycles, {} events, weights guard {:.3} habit {:.3} intuition {:.3}",
            kind,
            stats.len(),
            status.events,
            status.weights.guard,
            status.weights.habit,
            status.weights.intuition
        );
    }

    let master = sink.write_master(run_id, args.seed)?;
    println!("{}", master.display());
    Ok(())
}
