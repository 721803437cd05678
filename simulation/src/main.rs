use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use doppler_simulation::{ScenarioConfig, ScenarioReport, ScenarioRunner, SnapshotRecorder};

#[derive(Parser, Debug)]
#[command(name = "doppler-sim")]
#[command(about = "Replay order flow against a Doppler auction")]
struct Args {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario file
    Run {
        /// Path to the scenario TOML
        #[arg(short, long, default_value = "scenarios/default.toml")]
        scenario: PathBuf,

        /// Write slug snapshots (JSON lines) to this file
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Write an example scenario
    Init {
        #[arg(default_value = "scenario.toml")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match args.command {
        Command::Run {
            scenario,
            snapshots,
            json,
        } => run(scenario, snapshots, json),
        Command::Init { path } => {
            ScenarioConfig::example()
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote example scenario");
            Ok(())
        }
    }
}

fn run(path: PathBuf, snapshots: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let scenario = ScenarioConfig::load(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!(scenario = %scenario.name, orders = scenario.orders.len(), "loaded scenario");

    let mut runner = ScenarioRunner::new(scenario)?;
    let report = runner.run()?;

    if let Some(snapshot_path) = snapshots {
        let file = File::create(&snapshot_path)
            .with_context(|| format!("failed to create {}", snapshot_path.display()))?;
        let mut recorder = SnapshotRecorder::new(BufWriter::new(file));
        for frame in runner.frames() {
            recorder.record(frame)?;
        }
        info!(frames = recorder.frames(), path = %snapshot_path.display(), "wrote slug snapshots");
        recorder.finish()?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ScenarioReport) {
    println!("Scenario: {}", report.name);
    println!("Phase: {:?}", report.phase);
    println!("Last epoch: {}", report.last_epoch);
    println!("Tick accumulator: {}", report.tick_accumulator);
    println!("Final tick: {}", report.final_tick);
    println!("Tokens sold: {}", report.total_tokens_sold);
    println!("Proceeds: {}", report.total_proceeds);
    println!(
        "Orders: {} filled, {} rejected, {} skipped",
        report.filled, report.rejected, report.skipped
    );
    if let Some(migration) = &report.migration {
        println!(
            "Migrated: {} {} / {} {}",
            migration.balance0, migration.token0, migration.balance1, migration.token1
        );
    }
}
