//! Beltline headless runner.
//!
//! Loads a world, applies a build plan, and runs the simulation without a
//! renderer, printing goal progress and the event log.
//!
//! Run with: `cargo run --package beltline-demo -- run --seconds 60`

mod plan;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use beltline_core::config::WorldConfig;
use beltline_core::engine::Engine;
use beltline_core::fixed::{Fixed64, checked_f64_to_fixed64};
use beltline_core::validation::{check_invariants, validate_determinism};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::plan::BuildPlan;

const DEFAULT_WORLD: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/worlds/circuits.toml");
const DEFAULT_PLAN: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/worlds/circuits_plan.toml");

#[derive(Parser)]
#[command(name = "beltline")]
#[command(about = "Headless runner for the Beltline factory simulation")]
struct Cli {
    /// World configuration (TOML, JSON, or RON)
    #[arg(short, long, default_value = DEFAULT_WORLD)]
    world: PathBuf,

    /// Build plan applied before the first tick
    #[arg(short, long, default_value = DEFAULT_PLAN)]
    plan: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation and report progress
    Run {
        /// Simulated seconds to run
        #[arg(short, long, default_value = "60.0")]
        seconds: f64,

        /// Seconds per tick
        #[arg(long, default_value = "0.25")]
        dt: f64,

        /// Log a progress line every this many simulated seconds
        #[arg(long, default_value = "10.0")]
        report_every: f64,

        /// Recent log entries to print at the end
        #[arg(short, long, default_value = "10")]
        events: usize,
    },

    /// Run the plan twice and compare state hashes after every tick
    Verify {
        #[arg(short, long, default_value = "60.0")]
        seconds: f64,

        #[arg(long, default_value = "0.25")]
        dt: f64,
    },

    /// Print the map after applying the plan
    Map,

    /// List the world's recipe book
    Recipes,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = WorldConfig::load(&cli.world)
        .with_context(|| format!("loading world {}", cli.world.display()))?;
    let plan = BuildPlan::load(&cli.plan)?;
    info!(plan = %plan.name, commands = plan.commands.len(), "{}", plan.description);

    match cli.command {
        Commands::Run {
            seconds,
            dt,
            report_every,
            events,
        } => run(&config, &plan, seconds, dt, report_every, events),
        Commands::Verify { seconds, dt } => verify(&config, &plan, seconds, dt),
        Commands::Map => {
            let mut engine = Engine::new(&config)?;
            plan.apply(&mut engine);
            print!("{}", render::map(&engine));
            Ok(())
        }
        Commands::Recipes => {
            print!("{}", render::recipes(&Engine::new(&config)?));
            Ok(())
        }
    }
}

/// Number of ticks of `dt` covering `seconds`.
fn tick_count(seconds: f64, dt: f64) -> Result<(Fixed64, u64)> {
    if dt.is_nan() || dt <= 0.0 {
        bail!("dt must be positive, got {dt}");
    }
    if seconds.is_nan() || seconds < 0.0 {
        bail!("seconds must not be negative, got {seconds}");
    }
    let Some(step) = checked_f64_to_fixed64(dt) else {
        bail!("dt is out of range, got {dt}");
    };
    if seconds.is_infinite() {
        bail!("seconds must be finite");
    }
    Ok((step, (seconds / dt).ceil() as u64))
}

fn run(
    config: &WorldConfig,
    plan: &BuildPlan,
    seconds: f64,
    dt: f64,
    report_every: f64,
    events: usize,
) -> Result<()> {
    let (step, ticks) = tick_count(seconds, dt)?;
    let report_ticks = (report_every / dt).round().max(1.0) as u64;

    let mut engine = Engine::new(config)?;
    let rejected = plan.apply(&mut engine);
    if !rejected.is_empty() {
        info!(rejected = rejected.len(), "plan applied with rejections");
    }
    print!("{}", render::map(&engine));

    for _ in 0..ticks {
        let result = engine.tick(step);
        if let Some(status) = result.goal_transition {
            info!(tick = result.tick, ?status, "goal status changed");
        }
        if result.tick % report_ticks == 0 {
            let progress = engine.goal_progress();
            info!(
                tick = result.tick,
                elapsed = %engine.elapsed(),
                produced = progress.produced,
                shipped = progress.shipped,
                "progress"
            );
        }
    }

    let violations = check_invariants(&engine);
    for v in &violations {
        tracing::error!(%v, "invariant violated");
    }

    println!();
    print!("{}", render::goal(&engine));
    let trouble = render::trouble(&engine);
    if !trouble.is_empty() {
        println!("needs attention:");
        print!("{trouble}");
    }
    println!("recent events:");
    print!("{}", render::events(&engine, events));
    println!("state hash: {:#018x}", engine.state_hash());

    if !violations.is_empty() {
        bail!("{} invariant violations", violations.len());
    }
    Ok(())
}

fn verify(config: &WorldConfig, plan: &BuildPlan, seconds: f64, dt: f64) -> Result<()> {
    let (step, ticks) = tick_count(seconds, dt)?;
    let result = validate_determinism(config, &plan.script(step, ticks))?;
    match result.divergence_tick {
        None => {
            let last = result.hash_log.last().map_or(0, |e| e.1);
            println!("Determinism: PASS ({ticks} ticks, final hash {last:#018x})");
            Ok(())
        }
        Some(tick) => bail!("Determinism: FAIL at tick {tick}"),
    }
}
