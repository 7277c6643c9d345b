pub mod config;
mod orchestrator;
mod runs;
mod types;

pub use orchestrator::SequenceOrchestrator;
pub use runs::{apply_offsets, compute_offsets, destretch_sequence, rolling_aggregate};
pub use types::{format_elapsed, NoOpReporter, ProgressReporter, RunSummary, SequenceStage};
