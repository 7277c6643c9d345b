mod commands;
mod progress;
mod summary;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "destretch", about = "Destretching of astronomical image sequences")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads for per-frame parallel work (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show FITS header metadata
    Info(commands::info::InfoArgs),
    /// Register a sequence and write the corrected frames
    Destretch(commands::destretch::DestretchArgs),
    /// Register a sequence and write per-frame offset fields
    Offsets(commands::offsets::OffsetsArgs),
    /// Rolling median over a sequence (typically offset fields)
    Rolling(commands::rolling::RollingArgs),
    /// Warp frames by offsets minus their rolling average
    Apply(commands::apply::ApplyArgs),
    /// Print the default run config as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the thread pool")?;
        debug!(threads, "Configured thread pool");
    }

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Destretch(args) => commands::destretch::run(args),
        Commands::Offsets(args) => commands::offsets::run(args),
        Commands::Rolling(args) => commands::rolling::run(args),
        Commands::Apply(args) => commands::apply::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
