use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use destretch_core::io::FileSink;
use destretch_core::pipeline::{destretch_sequence, SequenceOrchestrator};
use destretch_core::pipeline::config::ReferenceMethod;
use destretch_core::reference;
use destretch_core::rolling::EdgePolicy;

use super::{collect_inputs, RegistrationArgs};
use crate::progress::BarReporter;
use crate::summary::{print_registration_summary, print_run_result};

#[derive(Args)]
pub struct DestretchArgs {
    #[command(flatten)]
    pub registration: RegistrationArgs,

    /// Output directory
    #[arg(short, long, default_value = "destretched")]
    pub output: PathBuf,
}

pub fn run(args: &DestretchArgs) -> Result<()> {
    let config = args.registration.resolve(ReferenceMethod::MarginComposite {
        margins: None,
        edge_policy: EdgePolicy::default(),
    })?;
    let inputs = collect_inputs(&args.registration.inputs)?;
    print_registration_summary("Destretch", &config, inputs.len(), &args.output);

    let orchestrator = SequenceOrchestrator::from_config(config.clone())
        .with_reporter(Arc::new(BarReporter::new()));
    let mut strategy = reference::from_method(
        &config.reference,
        orchestrator.source(),
        &inputs,
        config.index_convention,
    )?;
    let summary = destretch_sequence(
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
