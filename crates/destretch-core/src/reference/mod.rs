//! Suppliers of the reference frame each position is registered against.
//!
//! The orchestrator drives a strategy strictly in order: `prepare(i)`,
//! `original(i)`, `reference(i, ..)`, then `record(i, ..)` once the kernel
//! has produced a result. Strategies never see a position twice.

mod margin;
mod previous;

pub use margin::MarginComposite;
pub use previous::PreviousOutput;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::frame::{Frame, IndexConvention};
use crate::io::ImageSource;
use crate::kernel::DestretchResult;
use crate::pipeline::config::ReferenceMethod;
use crate::rolling::Margins;

pub trait ReferenceStrategy: Send {
    fn name(&self) -> &'static str;

    /// Called once per position before anything else.
    fn prepare(&mut self, _index: usize) -> Result<()> {
        Ok(())
    }

    /// The frame to register at `index`, if the strategy already holds it.
    /// `None` makes the orchestrator load it from its source.
    fn original(&mut self, _index: usize) -> Result<Option<Frame>> {
        Ok(None)
    }

    /// The reference for `index`. `original` is the frame about to be
    /// registered, after any normalization.
    fn reference(&mut self, index: usize, original: &Frame) -> Result<Frame>;

    /// Observe the result produced at `index`.
    fn record(&mut self, _index: usize, _result: &DestretchResult) {}
}

/// Build the strategy a config asks for.
pub fn from_method(
    method: &ReferenceMethod,
    source: Arc<dyn ImageSource>,
    paths: &[PathBuf],
    convention: IndexConvention,
) -> Result<Box<dyn ReferenceStrategy>> {
    Ok(match method {
        ReferenceMethod::PreviousOutput => Box::new(PreviousOutput::new()),
        ReferenceMethod::MarginComposite {
            margins,
            edge_policy,
        } => {
            let margins = match margins {
                Some([left, right]) => Some(Margins::new(*left, *right)?),
                None => None,
            };
            Box::new(MarginComposite::new(
                source,
                paths.to_vec(),
                convention,
                margins,
                *edge_policy,
            ))
        }
    })
}
