use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{DestretchError, Result};
use crate::frame::{Frame, IndexConvention};
use crate::io::{FileSource, ImageSource};
use crate::kernel::{DestretchResult, LocalCorrelationKernel, RegistrationKernel};
use crate::reference::ReferenceStrategy;
use crate::validate::{check_kernel_sizes, check_matching_counts, ResolutionGuard};

use super::config::DestretchConfig;
use super::types::{NoOpReporter, ProgressReporter, SequenceStage};

/// Drives frames through a reference strategy and a registration kernel.
///
/// Every run is a single ordered pass: one result per source, handed to the
/// caller's sink before the next source is touched. The first frame fixes
/// the sequence resolution and any later mismatch ends the run.
pub struct SequenceOrchestrator {
    source: Arc<dyn ImageSource>,
    kernel: Arc<dyn RegistrationKernel>,
    config: DestretchConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl SequenceOrchestrator {
    pub fn new(
        source: Arc<dyn ImageSource>,
        kernel: Arc<dyn RegistrationKernel>,
        config: DestretchConfig,
    ) -> Self {
        Self {
            source,
            kernel,
            config,
            reporter: Arc::new(NoOpReporter),
        }
    }

    /// Files on disk registered with [`LocalCorrelationKernel`].
    pub fn from_config(config: DestretchConfig) -> Self {
        let kernel = LocalCorrelationKernel {
            apodization: config.apodization,
        };
        Self::new(Arc::new(FileSource), Arc::new(kernel), config)
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn source(&self) -> Arc<dyn ImageSource> {
        Arc::clone(&self.source)
    }

    /// Register every source in order and pass each result to `sink`.
    ///
    /// Returns the number of results delivered, always `sources.len()` on
    /// success.
    pub fn run<F>(
        &self,
        sources: &[PathBuf],
        strategy: &mut dyn ReferenceStrategy,
        stage: SequenceStage,
        mut sink: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, DestretchResult) -> Result<()>,
    {
        let kernel_sizes = &self.config.kernel_sizes;
        check_kernel_sizes(kernel_sizes)?;
        info!(
            frames = sources.len(),
            kernel_sizes = ?kernel_sizes,
            strategy = strategy.name(),
            "Starting sequence"
        );

        let mut guard = ResolutionGuard::new();
        self.reporter.begin_stage(stage, Some(sources.len()));
        for (index, path) in sources.iter().enumerate() {
            strategy.prepare(index)?;
            let mut frame = match strategy.original(index)? {
                Some(frame) => frame,
                None => self.load(path, self.config.index_convention)?,
            };
            guard.check(&frame, path)?;
            if self.config.zero_mean {
                frame.subtract_mean();
            }

            let mut reference = strategy.reference(index, &frame)?;
            if self.config.zero_mean {
                reference.subtract_mean();
            }
            debug!(
                index,
                source = %path.display(),
                reference_checksum = reference.checksum(),
                "Registering frame"
            );

            let result = self.kernel.register(&frame, &reference, kernel_sizes)?;
            strategy.record(index, &result);
            sink(index, result)?;
            self.reporter.advance(index + 1);
        }
        self.reporter.finish_stage();

        Ok(sources.len())
    }

    /// Warp each data frame by `offset - average` through the grid of the
    /// finest kernel size.
    ///
    /// The three lists pair up by position. Data frames share the sequence
    /// resolution; offset and average fields share a second one.
    pub fn run_apply<F>(
        &self,
        data: &[PathBuf],
        offsets: &[PathBuf],
        averages: &[PathBuf],
        mut sink: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, DestretchResult) -> Result<()>,
    {
        check_matching_counts(
            ("data", data.len()),
            &[("offsets", offsets.len()), ("averages", averages.len())],
        )?;
        check_kernel_sizes(&self.config.kernel_sizes)?;
        let kernel_size = self.config.finest_kernel().ok_or_else(|| {
            DestretchError::Configuration("at least one kernel size is required".into())
        })?;
        info!(frames = data.len(), kernel_size, "Applying offsets");

        let mut guard = ResolutionGuard::new();
        let mut field_guard = ResolutionGuard::new();
        self.reporter
            .begin_stage(SequenceStage::ApplyingOffsets, Some(data.len()));
        let triples = data.iter().zip(offsets).zip(averages);
        for (index, ((data_path, offset_path), average_path)) in triples.enumerate() {
            let mut frame = self.load(data_path, self.config.index_convention)?;
            guard.check(&frame, data_path)?;
            frame.subtract_mean();

            // Fields are always written plane-major.
            let offset = self.load(offset_path, IndexConvention::Tyx)?;
            field_guard.check(&offset, offset_path)?;
            let average = self.load(average_path, IndexConvention::Tyx)?;
            field_guard.check(&average, average_path)?;
            if offset.planes() != average.planes() {
                return Err(DestretchError::Configuration(format!(
                    "'{}' has {} planes but '{}' has {}",
                    offset_path.display(),
                    offset.planes(),
                    average_path.display(),
                    average.planes()
                )));
            }

            let residual = Frame::new(&offset.data - &average.data);
            debug!(index, source = %data_path.display(), "Applying residual offsets");
            let result = self.kernel.apply_offsets(&frame, &residual, kernel_size)?;
            sink(index, result)?;
            self.reporter.advance(index + 1);
        }
        self.reporter.finish_stage();

        Ok(data.len())
    }

    fn load(&self, path: &Path, convention: IndexConvention) -> Result<Frame> {
        self.source.load(path, convention, None)
    }
}
