//! Per-frame geometric registration.
//!
//! A kernel estimates a local displacement at every control point of a grid
//! by correlating subframes of a frame against the matching subframes of a
//! reference, then resamples the frame onto the reference geometry.

mod correlation;
mod flct;
mod grid;
mod warp;

pub use correlation::SubframeCorrelator;
pub use flct::LocalCorrelationKernel;
pub use grid::DestretchParams;
pub use warp::{apply_displacement, interpolate_field, warp_plane};

use crate::error::{DestretchError, Result};
use crate::frame::Frame;

/// Output of registering one frame.
#[derive(Clone, Debug)]
pub struct DestretchResult {
    /// The frame resampled onto the reference geometry.
    pub corrected: Frame,
    /// Where each control point was found in the frame, shape (2, rows, cols):
    /// plane 0 is x (column), plane 1 is y (row).
    pub displacement_sum: Option<Frame>,
    /// Control-point positions on the reference, same layout.
    pub reference_displacement_sum: Option<Frame>,
    /// Grid geometry of the finest kernel size.
    pub params: DestretchParams,
}

impl DestretchResult {
    /// `displacement_sum - reference_displacement_sum`, when both are present.
    pub fn offsets(&self) -> Option<Frame> {
        match (&self.displacement_sum, &self.reference_displacement_sum) {
            (Some(disp), Some(rdisp)) => Some(Frame::new(&disp.data - &rdisp.data)),
            _ => None,
        }
    }
}

/// Registration of a frame against a reference.
///
/// Implementations must be deterministic. `kernel_sizes` are applied
/// coarse to fine. A frame whose shape differs from the reference is a
/// caller bug and is reported as [`DestretchError::RegistrationPrecondition`].
pub trait RegistrationKernel: Send + Sync {
    fn register(
        &self,
        frame: &Frame,
        reference: &Frame,
        kernel_sizes: &[usize],
    ) -> Result<DestretchResult>;

    /// Warp a frame by a precomputed control-point offset field laid out on
    /// the grid this kernel builds for `kernel_size`.
    fn apply_offsets(
        &self,
        frame: &Frame,
        offsets: &Frame,
        kernel_size: usize,
    ) -> Result<DestretchResult> {
        let params = DestretchParams::for_frame(frame.resolution(), kernel_size, 0.0)?;
        let corrected = apply_displacement(frame, &params, offsets)?;
        Ok(DestretchResult {
            corrected,
            displacement_sum: None,
            reference_displacement_sum: None,
            params,
        })
    }
}

/// Shared shape checks for kernel inputs.
pub(crate) fn check_inputs(frame: &Frame, reference: &Frame, kernel_sizes: &[usize]) -> Result<()> {
    if frame.data.shape() != reference.data.shape() {
        return Err(DestretchError::RegistrationPrecondition(format!(
            "frame shape {:?} does not match reference shape {:?}",
            frame.data.shape(),
            reference.data.shape()
        )));
    }
    if frame.planes() != 1 {
        return Err(DestretchError::RegistrationPrecondition(format!(
            "expected a single plane, found {}",
            frame.planes()
        )));
    }
    if kernel_sizes.is_empty() {
        return Err(DestretchError::RegistrationPrecondition(
            "no kernel sizes given".into(),
        ));
    }
    Ok(())
}
