use ndarray::{Array3, Axis, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{DestretchError, Result};
use crate::frame::Frame;

/// Element-wise median of equally shaped frames.
///
/// Even counts average the two middle values. Uses `select_nth_unstable`
/// for O(n) selection per sample and parallelizes over rows for large
/// frames.
pub fn median_of(frames: &[&Frame]) -> Result<Frame> {
    let first = frames.first().ok_or(DestretchError::EmptySequence)?;
    let shape = first.data.dim();
    if let Some(other) = frames.iter().find(|f| f.data.dim() != shape) {
        return Err(DestretchError::Configuration(format!(
            "cannot take a median of shapes {:?} and {:?}",
            shape,
            other.data.dim()
        )));
    }

    let n = frames.len();
    if n == 1 {
        return Ok((*first).clone());
    }

    let (planes, h, w) = shape;
    let mut out = Array3::<f32>::zeros((planes, h, w));
    let reduce_row = |(p, r): (usize, usize), mut row: ndarray::ArrayViewMut1<f32>| {
        let mut values = vec![0.0f32; n];
        for (c, dst) in row.iter_mut().enumerate() {
            for (v, frame) in values.iter_mut().zip(frames) {
                *v = frame.data[[p, r, c]];
            }
            *dst = median_in_place(&mut values);
        }
    };

    let lanes = Zip::indexed(out.lanes_mut(Axis(2)));
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        lanes.par_for_each(reduce_row);
    } else {
        lanes.for_each(reduce_row);
    }

    Ok(Frame::new(out))
}

fn median_in_place(values: &mut [f32]) -> f32 {
    let n = values.len();
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    if n % 2 == 1 {
        *upper
    } else {
        let upper = *upper;
        // after partitioning, the lower middle is the max of the left half
        let lower_mid = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        (lower_mid + upper) / 2.0
    }
}
