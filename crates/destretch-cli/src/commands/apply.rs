use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use destretch_core::io::FileSink;
use destretch_core::pipeline::{apply_offsets, SequenceOrchestrator};

use super::{collect_inputs, load_run_config, ConventionArg};
use crate::progress::BarReporter;
use crate::summary::{print_registration_summary, print_run_result};

#[derive(Args)]
pub struct ApplyArgs {
    /// Data frames, or directories of FITS files
    #[arg(long, required = true, num_args = 1..)]
    pub data: Vec<PathBuf>,

    /// Offset fields written by `offsets`, one per data frame
    #[arg(long, required = true, num_args = 1..)]
    pub offsets: Vec<PathBuf>,

    /// Averaged offset fields written by `rolling`, one per data frame
    #[arg(long, required = true, num_args = 1..)]
    pub averages: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "destretched")]
    pub output: PathBuf,

    /// Run config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comma-separated kernel sizes the offsets were computed with
    #[arg(long, value_delimiter = ',')]
    pub kernels: Option<Vec<usize>>,

    /// Axis order of the stored data arrays
    #[arg(long, value_enum)]
    pub axes: Option<ConventionArg>,
}

pub fn run(args: &ApplyArgs) -> Result<()> {
    let mut config = load_run_config(args.config.as_deref())?.destretch;
    if let Some(ref kernels) = args.kernels {
        config.kernel_sizes = kernels.clone();
    }
    if let Some(axes) = args.axes {
        config.index_convention = axes.into();
    }

    let data = collect_inputs(&args.data)?;
    let offsets = collect_inputs(&args.offsets)?;
    let averages = collect_inputs(&args.averages)?;
    print_registration_summary("Apply Offsets", &config, data.len(), &args.output);

    let orchestrator =
        SequenceOrchestrator::from_config(config).with_reporter(Arc::new(BarReporter::new()));
    let summary = apply_offsets(
        &orchestrator,
        &data,
        &offsets,
        &averages,
        &args.output,
        &mut FileSink,
    )?;

    print_run_result(&summary);
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}
