use ndarray::{Array2, ArrayView2, ArrayView3, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{DestretchError, Result};
use crate::frame::Frame;

use super::grid::DestretchParams;

/// Bilinearly interpolate per-control-point offsets to every pixel.
///
/// `offsets` has shape (2, rows, cols) with x in plane 0 and y in plane 1.
/// Pixels outside the outermost control points take the nearest edge value.
/// Returns `(offset_y, offset_x)` fields of shape `(height, width)`.
pub fn interpolate_field(
    params: &DestretchParams,
    offsets: ArrayView3<f32>,
    height: usize,
    width: usize,
) -> (Array2<f64>, Array2<f64>) {
    let rows = params.row_centers();
    let cols = params.col_centers();

    let row_brackets: Vec<_> = (0..height).map(|r| find_interval(&rows, r)).collect();
    let col_brackets: Vec<_> = (0..width).map(|c| find_interval(&cols, c)).collect();

    let field = |plane: usize| {
        Array2::from_shape_fn((height, width), |(r, c)| {
            let (i0, i1, fy) = row_brackets[r];
            let (j0, j1, fx) = col_brackets[c];
            let v = |i: usize, j: usize| offsets[[plane, i, j]] as f64;
            v(i0, j0) * (1.0 - fx) * (1.0 - fy)
                + v(i0, j1) * fx * (1.0 - fy)
                + v(i1, j0) * (1.0 - fx) * fy
                + v(i1, j1) * fx * fy
        })
    };

    (field(1), field(0))
}

/// Bracketing interval and interpolation fraction for `val` in sorted
/// `positions`, clamped at both ends.
fn find_interval(positions: &[usize], val: usize) -> (usize, usize, f64) {
    let n = positions.len();
    if n == 0 || val <= positions[0] {
        return (0, 0, 0.0);
    }
    if val >= positions[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let hi = positions.partition_point(|&p| p <= val);
    let lo = hi - 1;
    let span = (positions[hi] - positions[lo]) as f64;
    (lo, hi, (val - positions[lo]) as f64 / span)
}

/// Resample a plane so that `out[r, c] = data[r + offset_y, c + offset_x]`.
///
/// Sample positions are clamped to the frame, so borders replicate the
/// nearest edge pixel instead of going dark.
pub fn warp_plane(
    data: ArrayView2<f64>,
    offset_y: &Array2<f64>,
    offset_x: &Array2<f64>,
) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut out = Array2::<f64>::zeros((h, w));
    let sample = |(r, c): (usize, usize), v: &mut f64| {
        *v = bilinear_clamped(&data, r as f64 + offset_y[[r, c]], c as f64 + offset_x[[r, c]]);
    };
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut out).par_for_each(sample);
    } else {
        Zip::indexed(&mut out).for_each(sample);
    }
    out
}

fn bilinear_clamped(data: &ArrayView2<f64>, y: f64, x: f64) -> f64 {
    let (h, w) = data.dim();
    let y = y.clamp(0.0, (h - 1) as f64);
    let x = x.clamp(0.0, (w - 1) as f64);

    let y0 = y.floor() as usize;
    let x0 = x.floor() as usize;
    let y1 = (y0 + 1).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let fy = y - y0 as f64;
    let fx = x - x0 as f64;

    data[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
        + data[[y0, x1]] * fx * (1.0 - fy)
        + data[[y1, x0]] * (1.0 - fx) * fy
        + data[[y1, x1]] * fx * fy
}

/// Warp a single-plane frame by a control-point offset field laid out on
/// `params`.
pub fn apply_displacement(frame: &Frame, params: &DestretchParams, offsets: &Frame) -> Result<Frame> {
    if frame.planes() != 1 {
        return Err(DestretchError::RegistrationPrecondition(format!(
            "expected a single plane, found {}",
            frame.planes()
        )));
    }
    let expected = [2, params.rows, params.cols];
    if offsets.data.shape() != &expected[..] {
        return Err(DestretchError::RegistrationPrecondition(format!(
            "offset field shape {:?} does not match control grid {:?}",
            offsets.data.shape(),
            expected
        )));
    }

    let (h, w) = (frame.height(), frame.width());
    let (offset_y, offset_x) = interpolate_field(params, offsets.data.view(), h, w);
    let data = frame.plane(0).mapv(|v| v as f64);
    let warped = warp_plane(data.view(), &offset_y, &offset_x);
    Ok(Frame::from_plane(warped.mapv(|v| v as f32)))
}
