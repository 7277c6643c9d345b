use ndarray::{s, Array2, Array3};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{DEFAULT_APODIZATION_FRACTION, PARALLEL_CONTROL_POINT_THRESHOLD};
use crate::error::{DestretchError, Result};
use crate::frame::Frame;

use super::correlation::SubframeCorrelator;
use super::grid::DestretchParams;
use super::warp::{interpolate_field, warp_plane};
use super::{check_inputs, DestretchResult, RegistrationKernel};

/// Local correlation tracking on a control-point grid.
///
/// Each kernel size partitions the frame into half-overlapping subframes.
/// Every subframe of the current warped frame is phase-correlated against
/// the matching reference subframe, the control-point offsets are
/// interpolated to a per-pixel field and added to the running field, and
/// the original frame is re-warped by the total before the next size.
#[derive(Clone, Debug)]
pub struct LocalCorrelationKernel {
    pub apodization: f64,
}

impl Default for LocalCorrelationKernel {
    fn default() -> Self {
        Self {
            apodization: DEFAULT_APODIZATION_FRACTION,
        }
    }
}

impl RegistrationKernel for LocalCorrelationKernel {
    fn register(
        &self,
        frame: &Frame,
        reference: &Frame,
        kernel_sizes: &[usize],
    ) -> Result<DestretchResult> {
        check_inputs(frame, reference, kernel_sizes)?;

        let (h, w) = (frame.height(), frame.width());
        let original = frame.plane(0).mapv(|v| v as f64);
        let reference = reference.plane(0).mapv(|v| v as f64);

        let mut offset_y = Array2::<f64>::zeros((h, w));
        let mut offset_x = Array2::<f64>::zeros((h, w));
        let mut warped = original.clone();
        let mut finest = None;

        for &size in kernel_sizes {
            let params = DestretchParams::for_frame(frame.resolution(), size, self.apodization)?;
            let correlator = SubframeCorrelator::new(size, self.apodization);
            let offsets = control_point_offsets(&warped, &reference, &params, &correlator);

            let (fy, fx) = interpolate_field(&params, offsets.view(), h, w);
            offset_y += &fy;
            offset_x += &fx;
            warped = warp_plane(original.view(), &offset_y, &offset_x);

            debug!(
                kernel_size = size,
                control_points = params.len(),
                "Kernel pass complete"
            );
            finest = Some(params);
        }

        let params = finest.ok_or_else(|| {
            DestretchError::RegistrationPrecondition("no kernel sizes given".into())
        })?;

        let reference_displacement = params.positions();
        let mut displacement = reference_displacement.clone();
        for i in 0..params.rows {
            for j in 0..params.cols {
                let (cy, cx) = params.center(i, j);
                displacement.data[[0, i, j]] += offset_x[[cy, cx]] as f32;
                displacement.data[[1, i, j]] += offset_y[[cy, cx]] as f32;
            }
        }

        Ok(DestretchResult {
            corrected: Frame::from_plane(warped.mapv(|v| v as f32)),
            displacement_sum: Some(displacement),
            reference_displacement_sum: Some(reference_displacement),
            params,
        })
    }
}

/// Offsets of every control point, shape (2, rows, cols): x then y.
fn control_point_offsets(
    frame: &Array2<f64>,
    reference: &Array2<f64>,
    params: &DestretchParams,
    correlator: &SubframeCorrelator,
) -> Array3<f32> {
    let size = correlator.size();
    let points: Vec<(usize, usize)> = (0..params.rows)
        .flat_map(|i| (0..params.cols).map(move |j| (i, j)))
        .collect();

    let measure = |&(i, j): &(usize, usize)| {
        let (y0, x0) = params.subframe_origin(i, j);
        correlator.offset(
            reference.slice(s![y0..y0 + size, x0..x0 + size]),
            frame.slice(s![y0..y0 + size, x0..x0 + size]),
        )
    };

    let measured: Vec<(f64, f64)> = if points.len() >= PARALLEL_CONTROL_POINT_THRESHOLD {
        points.par_iter().map(measure).collect()
    } else {
        points.iter().map(measure).collect()
    };

    let mut offsets = Array3::<f32>::zeros((2, params.rows, params.cols));
    for (&(i, j), &(dy, dx)) in points.iter().zip(&measured) {
        offsets[[0, i, j]] = dx as f32;
        offsets[[1, i, j]] = dy as f32;
    }
    offsets
}
