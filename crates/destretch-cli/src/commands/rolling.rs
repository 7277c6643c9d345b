use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use destretch_core::io::{FileSink, FileSource};
use destretch_core::pipeline::rolling_aggregate;

use super::{collect_inputs, load_run_config, ConventionArg, EdgeArg};
use crate::progress::BarReporter;
use crate::summary::{print_rolling_summary, print_run_result};

#[derive(Args)]
pub struct RollingArgs {
    /// Input frames, or directories of FITS files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "averages")]
    pub output: PathBuf,

    /// Run config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames before each position
    #[arg(long, allow_negative_numbers = true)]
    pub margin_left: Option<i64>,

    /// Frames after each position
    #[arg(long, allow_negative_numbers = true)]
    pub margin_right: Option<i64>,

    /// Window edge handling
    #[arg(long, value_enum)]
    pub edges: Option<EdgeArg>,

    /// Axis order of the stored input arrays
    #[arg(long, value_enum)]
    pub axes: Option<ConventionArg>,
}

pub fn run(args: &RollingArgs) -> Result<()> {
    let mut config = load_run_config(args.config.as_deref())?.rolling;
    if let Some(left) = args.margin_left {
        config.margin_left = left;
    }
    if let Some(right) = args.margin_right {
        config.margin_right = right;
    }
    if let Some(edges) = args.edges {
        config.edge_policy = edges.into();
    }
    if let Some(axes) = args.axes {
        config.index_convention = axes.into();
    }

    let inputs = collect_inputs(&args.inputs)?;
    print_rolling_summary(&config, inputs.len(), &args.output);

    let reporter = BarReporter::new();
    let summary = rolling_aggregate(
        &FileSource,
        &inputs,
        &args.output,
        &config,
        &mut FileSink,
        &reporter,
    )?;

    print_run_result(&summary);
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}
