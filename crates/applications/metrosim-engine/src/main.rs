//! metrosim CLI
//!
//! Runs Markov-chain crime-incident simulations over Metro stations.
//!
//! ```bash
//! # One scenario, reproducible, with CSV exports
//! metrosim --data-dir data simulate --category with_violence --policy mobile \
//!     --start Pantitlán --steps 50 --seed 42 --trajectory-csv trajectory.csv
//!
//! # All three policies side by side
//! metrosim --data-dir data compare --category without_violence --start Hidalgo --steps 500
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrosim_core::{CrimeCategory, Policy, ScenarioKey, VisitFrequency};
use metrosim_engine::{
    export::{save_frequency_csv, save_trajectory_csv, SimulationReport},
    summarize, ScenarioConfig, ScenarioSelector, Walker,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// metrosim: crime-incident Markov chains on the Metro network
#[derive(Parser)]
#[command(name = "metrosim")]
#[command(about = "Simulate crime incidents across Metro stations under policing policies", long_about = None)]
struct Cli {
    /// Scenario config file (JSON)
    #[arg(long, global = true, env = "METROSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the six matrix files (overrides the config)
    #[arg(long, global = true, env = "METROSIM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Damping factor for mobile reinforcement (overrides the config)
    #[arg(long, global = true)]
    damping: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario and print the trajectory and visit counts
    Simulate {
        /// Crime category (with_violence, without_violence)
        #[arg(short, long)]
        category: String,

        /// Policy (base, fixed_reinforcement, mobile_reinforcement)
        #[arg(short, long, default_value = "base")]
        policy: String,

        /// Starting station
        #[arg(short, long)]
        start: String,

        /// Trajectory length, start station included
        #[arg(short = 'n', long, default_value_t = 20)]
        steps: usize,

        /// RNG seed (random if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Write `step,station` CSV here
        #[arg(long)]
        trajectory_csv: Option<PathBuf>,

        /// Write `station,visits` CSV here
        #[arg(long)]
        frequency_csv: Option<PathBuf>,

        /// Write a JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run all three policies for a category with the same seed
    Compare {
        /// Crime category (with_violence, without_violence)
        #[arg(short, long)]
        category: String,

        /// Starting station
        #[arg(short, long)]
        start: String,

        /// Trajectory length, start station included
        #[arg(short = 'n', long, default_value_t = 500)]
        steps: usize,

        /// RNG seed (random if omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List the stations of a scenario's transition table
    Stations {
        /// Crime category (with_violence, without_violence)
        #[arg(short, long)]
        category: String,

        /// Policy (base, fixed_reinforcement, mobile_reinforcement)
        #[arg(short, long, default_value = "base")]
        policy: String,
    },

    /// List the six scenarios and their matrix files
    Scenarios,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metrosim=info,metrosim_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let selector = ScenarioSelector::new(config).context("Invalid scenario configuration")?;

    match cli.command {
        Commands::Simulate {
            category,
            policy,
            start,
            steps,
            seed,
            trajectory_csv,
            frequency_csv,
            output,
        } => {
            let scenario = selector.select_named(&category, &policy)?;
            let seed = seed.unwrap_or_else(rand::random);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            info!(scenario = %scenario.key(), start = %start, steps, seed, "Running simulation");
            let trajectory = scenario
                .run(&start, steps, &mut rng)
                .with_context(|| format!("Simulation of {} from '{}' failed", scenario.key(), start))?;

            let report = SimulationReport::new(scenario.key(), scenario.walker().name(), seed, trajectory);

            println!("Scenario: {} ({} walker, seed {})", report.scenario, report.walker, report.seed);
            if let Some(reinforced) = scenario.reinforced() {
                let names: Vec<&str> = reinforced.iter().map(|s| s.as_str()).collect();
                println!("Reinforced stations: {}", names.join(", "));
            }

            println!("\n{:>6}  {}", "Step", "Station");
            println!("{}", "-".repeat(40));
            for (step, station) in report.trajectory.steps() {
                println!("{:>6}  {}", step, station);
            }

            print_frequency(&report.frequencies);

            if let Some(path) = trajectory_csv {
                save_trajectory_csv(&report.trajectory, &path)?;
                info!(path = %path.display(), "Trajectory CSV written");
            }
            if let Some(path) = frequency_csv {
                save_frequency_csv(&report.frequencies, &path)?;
                info!(path = %path.display(), "Frequency CSV written");
            }
            if let Some(path) = output {
                report.save(&path)?;
                info!(path = %path.display(), "JSON report written");
            }
        }

        Commands::Compare {
            category,
            start,
            steps,
            seed,
        } => {
            let category = CrimeCategory::parse(&category).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown crime category '{}' (expected with_violence or without_violence)",
                    category
                )
            })?;
            let seed = seed.unwrap_or_else(rand::random);

            let mut results = Vec::new();
            for policy in Policy::ALL {
                let scenario = selector.select(ScenarioKey::new(category, policy))?;
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let trajectory = scenario
                    .run(&start, steps, &mut rng)
                    .with_context(|| format!("Simulation of {} from '{}' failed", scenario.key(), start))?;
                results.push((policy, summarize(&trajectory)));
            }

            let reinforced = selector.config().reinforced.for_category(category);
            let base = selector.select(ScenarioKey::new(category, Policy::Base))?;

            println!("Category: {}  start: {}  steps: {}  seed: {}\n", category, start, steps, seed);
            print!("{:<24}", "Station");
            for (policy, _) in &results {
                print!(" {:>22}", policy.as_str());
            }
            println!();
            println!("{}", "-".repeat(24 + 23 * results.len()));

            for station in base.table().stations() {
                let marker = if reinforced.contains(station.as_str()) { "*" } else { " " };
                print!("{}{:<23}", marker, station.as_str());
                for (_, frequency) in &results {
                    print!(" {:>22}", frequency.count(station.as_str()));
                }
                println!();
            }

            println!("{}", "-".repeat(24 + 23 * results.len()));
            print!("{:<24}", "Reinforced share (*)");
            for (_, frequency) in &results {
                let hits: usize = reinforced.iter().map(|s| frequency.count(s.as_str())).sum();
                let share = hits as f64 / frequency.total().max(1) as f64 * 100.0;
                print!(" {:>21.1}%", share);
            }
            println!();
        }

        Commands::Stations { category, policy } => {
            let scenario = selector.select_named(&category, &policy)?;
            let reinforced = selector.config().reinforced.for_category(scenario.key().category);

            println!("Stations in {} ({}):", scenario.key(), scenario.source().display());
            for station in scenario.table().stations() {
                let marker = if reinforced.contains(station.as_str()) { " (reinforced under mobile policy)" } else { "" };
                println!("  {}{}", station, marker);
            }
        }

        Commands::Scenarios => {
            println!("{:<45} {:<11} {}", "Scenario", "Walker", "Matrix");
            println!("{}", "-".repeat(100));
            for key in ScenarioKey::all() {
                let walker = selector.walker_for(key)?;
                let path = selector.config().matrix_path(key)?;
                println!("{:<45} {:<11} {}", key.to_string(), walker.name(), path.display());
            }
        }
    }

    Ok(())
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(cli: &Cli) -> anyhow::Result<ScenarioConfig> {
    let mut config = match &cli.config {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScenarioConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(damping) = cli.damping {
        config.damping_factor = damping;
    }

    Ok(config)
}

fn print_frequency(frequency: &VisitFrequency) {
    println!("\n{:<24} {:>8} {:>8}", "Station", "Visits", "Share");
    println!("{}", "-".repeat(42));
    for entry in frequency.sorted_by_count() {
        let share = entry.visits as f64 / frequency.total() as f64 * 100.0;
        println!("{:<24} {:>8} {:>7.1}%", entry.station.as_str(), entry.visits, share);
    }
}
