use std::path::Path;

use crate::error::{DestretchError, Result};
use crate::frame::{Frame, Resolution};

/// Enforces one (height, width) across a sequence.
///
/// The first checked frame fixes the resolution; every later frame must
/// match it exactly.
#[derive(Clone, Debug, Default)]
pub struct ResolutionGuard {
    expected: Option<Resolution>,
}

impl ResolutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, frame: &Frame, source: &Path) -> Result<Resolution> {
        let found = frame.resolution();
        match self.expected {
            None => {
                self.expected = Some(found);
                Ok(found)
            }
            Some(expected) if expected == found => Ok(found),
            Some(expected) => Err(DestretchError::ResolutionMismatch {
                path: source.to_path_buf(),
                expected: expected.as_tuple(),
                found: found.as_tuple(),
            }),
        }
    }
}

/// Kernel sizes must be a non-empty list of positive integers.
pub fn check_kernel_sizes(sizes: &[usize]) -> Result<()> {
    if sizes.is_empty() {
        return Err(DestretchError::Configuration(
            "at least one kernel size is required".into(),
        ));
    }
    if let Some(pos) = sizes.iter().position(|&k| k == 0) {
        return Err(DestretchError::Configuration(format!(
            "kernel size #{pos} must be positive"
        )));
    }
    Ok(())
}

/// Auxiliary source lists must pair one-to-one with the primary list.
pub fn check_matching_counts(primary: (&str, usize), others: &[(&str, usize)]) -> Result<()> {
    let (name, count) = primary;
    for &(other, other_count) in others {
        if other_count != count {
            return Err(DestretchError::Configuration(format!(
                "each {name} file needs a matching {other} file ({count} vs {other_count})"
            )));
        }
    }
    Ok(())
}
