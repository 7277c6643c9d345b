use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use destretch_core::io::FileSink;
use destretch_core::pipeline::{compute_offsets, SequenceOrchestrator};
use destretch_core::pipeline::config::ReferenceMethod;
use destretch_core::reference;

use super::{collect_inputs, RegistrationArgs};
use crate::progress::BarReporter;
use crate::summary::{print_registration_summary, print_run_result};

#[derive(Args)]
pub struct OffsetsArgs {
    #[command(flatten)]
    pub registration: RegistrationArgs,

    /// Output directory
    #[arg(short, long, default_value = "offsets")]
    pub output: PathBuf,
}

pub fn run(args: &OffsetsArgs) -> Result<()> {
    let config = args.registration.resolve(ReferenceMethod::PreviousOutput)?;
    let inputs = collect_inputs(&args.registration.inputs)?;
    print_registration_summary("Offsets", &config, inputs.len(), &args.output);

    let orchestrator = SequenceOrchestrator::from_config(config.clone())
        .with_reporter(Arc::new(BarReporter::new()));
    let mut strategy = reference::from_method(
        &config.reference,
        orchestrator.source(),
        &inputs,
        config.index_convention,
    )?;
    let summary = compute_offsets(
        &orchestrator,
        &inputs,
        &args.output,
        strategy.as_mut(),
        &mut FileSink,
    )?;

    print_run_result(&summary);
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}
