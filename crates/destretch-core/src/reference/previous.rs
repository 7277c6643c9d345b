use tracing::debug;

use crate::error::{DestretchError, Result};
use crate::frame::Frame;
use crate::kernel::DestretchResult;

use super::ReferenceStrategy;

/// References each frame against the corrected output of the frame before.
///
/// Position 0 has no predecessor and is registered against itself.
#[derive(Debug, Default)]
pub struct PreviousOutput {
    previous: Option<Frame>,
}

impl PreviousOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceStrategy for PreviousOutput {
    fn name(&self) -> &'static str {
        "previous output"
    }

    fn reference(&mut self, index: usize, original: &Frame) -> Result<Frame> {
        if index == 0 {
            debug!("First frame is its own reference");
            return Ok(original.clone());
        }
        self.previous.take().ok_or_else(|| {
            DestretchError::RegistrationPrecondition(format!(
                "no corrected frame recorded before position {index}"
            ))
        })
    }

    fn record(&mut self, _index: usize, result: &DestretchResult) {
        self.previous = Some(result.corrected.clone());
    }
}
