use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::consts::{AVERAGE_SUFFIX, DESTRETCHED_STEM, FITS_SUFFIX, OFFSETS_STEM, OFFSETS_SUFFIX};
use crate::error::{DestretchError, Result};
use crate::io::{ImageSource, NumberedWriter, OutputNaming, OutputSink};
use crate::reference::ReferenceStrategy;
use crate::rolling::{Aggregate, RollingAggregator};

use super::config::RollingConfig;
use super::orchestrator::SequenceOrchestrator;
use super::types::{format_elapsed, ProgressReporter, RunSummary, SequenceStage};

/// Register every source and write the corrected frames as
/// `destretched<n>.fits` under `out_dir`.
pub fn destretch_sequence(
    orchestrator: &SequenceOrchestrator,
    sources: &[PathBuf],
    out_dir: &Path,
    strategy: &mut dyn ReferenceStrategy,
    sink: &mut dyn OutputSink,
) -> Result<RunSummary> {
    let start = Instant::now();
    fs::create_dir_all(out_dir)?;

    let naming = OutputNaming::new(out_dir, DESTRETCHED_STEM, FITS_SUFFIX, sources.len());
    let mut writer = NumberedWriter::new(naming, sink);
    orchestrator.run(sources, strategy, SequenceStage::Destretching, |_, result| {
        writer.write_next(&result.corrected).map(|_| ())
    })?;

    Ok(summarize("Destretch", writer.into_paths(), start))
}

/// Register every source and write each control-point offset field
/// (`displacement - reference displacement`) as `offsets<n>.off.fits`.
pub fn compute_offsets(
    orchestrator: &SequenceOrchestrator,
    sources: &[PathBuf],
    out_dir: &Path,
    strategy: &mut dyn ReferenceStrategy,
    sink: &mut dyn OutputSink,
) -> Result<RunSummary> {
    let start = Instant::now();
    fs::create_dir_all(out_dir)?;

    let naming = OutputNaming::new(out_dir, OFFSETS_STEM, OFFSETS_SUFFIX, sources.len());
    let mut writer = NumberedWriter::new(naming, sink);
    orchestrator.run(sources, strategy, SequenceStage::ComputingOffsets, |index, result| {
        let offsets = result.offsets().ok_or_else(|| {
            DestretchError::RegistrationPrecondition(format!(
                "kernel returned no displacement fields for frame {index}"
            ))
        })?;
        writer.write_next(&offsets).map(|_| ())
    })?;

    Ok(summarize("Offset computation", writer.into_paths(), start))
}

/// Stream `sources` through a [`RollingAggregator`] and write one median
/// per position as `offsets<n>.avg.fits`.
pub fn rolling_aggregate(
    source: &dyn ImageSource,
    sources: &[PathBuf],
    out_dir: &Path,
    config: &RollingConfig,
    sink: &mut dyn OutputSink,
    reporter: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut aggregator = RollingAggregator::from_config(sources.len(), config)?;
    fs::create_dir_all(out_dir)?;
    info!(frames = sources.len(), window = %config, "Starting rolling median");

    let naming = OutputNaming::new(out_dir, OFFSETS_STEM, AVERAGE_SUFFIX, sources.len());
    let mut writer = NumberedWriter::new(naming, sink);
    reporter.begin_stage(SequenceStage::Aggregating, Some(sources.len()));
    for path in sources {
        let frame = source.load(path, config.index_convention, None)?;
        aggregator.push(frame, path, |aggregate| {
            write_aggregate(&mut writer, reporter, aggregate)
        })?;
    }
    info!(
        peak_resident = aggregator.peak_resident(),
        "All frames loaded"
    );
    aggregator.finish(|aggregate| write_aggregate(&mut writer, reporter, aggregate))?;
    reporter.finish_stage();

    Ok(summarize("Rolling median", writer.into_paths(), start))
}

/// Warp data frames by `offset - average` and write them as
/// `destretched<n>.fits`.
pub fn apply_offsets(
    orchestrator: &SequenceOrchestrator,
    data: &[PathBuf],
    offsets: &[PathBuf],
    averages: &[PathBuf],
    out_dir: &Path,
    sink: &mut dyn OutputSink,
) -> Result<RunSummary> {
    let start = Instant::now();
    fs::create_dir_all(out_dir)?;

    let naming = OutputNaming::new(out_dir, DESTRETCHED_STEM, FITS_SUFFIX, data.len());
    let mut writer = NumberedWriter::new(naming, sink);
    orchestrator.run_apply(data, offsets, averages, |_, result| {
        writer.write_next(&result.corrected).map(|_| ())
    })?;

    Ok(summarize("Offset application", writer.into_paths(), start))
}

fn write_aggregate(
    writer: &mut NumberedWriter<'_>,
    reporter: &dyn ProgressReporter,
    aggregate: Aggregate<'_>,
) -> Result<()> {
    writer.write_next(aggregate.frame)?;
    reporter.advance(aggregate.position + 1);
    Ok(())
}

fn summarize(label: &str, outputs: Vec<PathBuf>, start: Instant) -> RunSummary {
    let elapsed = start.elapsed();
    info!(
        outputs = outputs.len(),
        elapsed = %format_elapsed(elapsed),
        "{label} finished"
    );
    RunSummary { outputs, elapsed }
}
