//! leadflow - offline pipeline reports
//!
//! Reads a JSON export and prints what a given user would see.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadflow_core::{PipelineConfig, Snapshot};
use leadflow_metrics::BadgeProgress;
use leadflow_model::{BadgeTier, UserId};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// leadflow - sales pipeline reports
#[derive(Parser, Debug)]
#[command(name = "leadflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scoped funnel, FYC, conversion and leaderboards for one user
    Summary {
        /// JSON export with users, groups, prospects and events
        #[arg(long)]
        snapshot: PathBuf,

        /// User whose view to report
        #[arg(long)]
        user: String,
    },

    /// Badge tier progress for a points total
    Badge {
        /// Total points
        #[arg(long)]
        points: u64,

        /// JSON file with an ascending tier list (defaults to configured tiers)
        #[arg(long)]
        tiers: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn summary(snapshot: &Path, user: &str) -> Result<()> {
    let raw = std::fs::read_to_string(snapshot)
        .with_context(|| format!("failed to read snapshot {}", snapshot.display()))?;
    let snapshot = Snapshot::from_json(&raw).context("failed to ingest snapshot")?;
    tracing::info!(
        users = snapshot.users.len(),
        prospects = snapshot.prospects.len(),
        "snapshot loaded"
    );

    let report = snapshot
        .report_for(&UserId::from(user))
        .with_context(|| format!("user '{user}' not found in snapshot"))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn badge(config: &PipelineConfig, points: u64, tiers: Option<&Path>) -> Result<()> {
    let tiers: Vec<BadgeTier> = match tiers {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read tiers {}", path.display()))?;
            serde_json::from_str(&raw).context("tiers must be a JSON array")?
        }
        None => config.badge_tiers.clone(),
    };
    BadgeTier::ensure_ascending(&tiers)?;

    let progress = BadgeProgress::lookup(points, &tiers);
    println!("{}", serde_json::to_string_pretty(&progress)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Summary { snapshot, user } => summary(snapshot, user),
        Commands::Badge { points, tiers } => badge(&config, *points, tiers.as_deref()),
    }
}
