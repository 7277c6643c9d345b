use std::path::PathBuf;
use std::time::Duration;

use crate::consts::ELAPSED_UNIT_THRESHOLD;

/// Sequence processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceStage {
    Destretching,
    ComputingOffsets,
    Aggregating,
    ApplyingOffsets,
}

impl std::fmt::Display for SequenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Destretching => write!(f, "Destretching"),
            Self::ComputingOffsets => write!(f, "Computing offsets"),
            Self::Aggregating => write!(f, "Rolling median"),
            Self::ApplyingOffsets => write!(f, "Applying offsets"),
        }
    }
}

/// Thread-safe progress reporting for sequence runs.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of frames in
    /// this stage, if known.
    fn begin_stage(&self, _stage: SequenceStage, _total_items: Option<usize>) {}

    /// `items_done` frames of the current stage are complete.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// What a completed run produced.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Written files, in output order.
    pub outputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

/// Render a duration in seconds, minutes past 120 s, or hours past 120 min.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < ELAPSED_UNIT_THRESHOLD {
        return format!("{seconds:.3} seconds");
    }
    let minutes = seconds / 60.0;
    if minutes < ELAPSED_UNIT_THRESHOLD {
        return format!("{minutes:.3} minutes");
    }
    format!("{:.3} hours", minutes / 60.0)
}
