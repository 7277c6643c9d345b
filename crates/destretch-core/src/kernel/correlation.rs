use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::consts::EPSILON;

/// Phase correlation of square subframes of one fixed size.
///
/// FFT plans and the apodization window are built once per kernel size and
/// shared by every control point, including across rayon workers.
pub struct SubframeCorrelator {
    size: usize,
    window: Array2<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl SubframeCorrelator {
    pub fn new(size: usize, apodization: f64) -> Self {
        let mut planner = FftPlanner::new();
        let taper = taper_1d(size, apodization);
        let window = Array2::from_shape_fn((size, size), |(r, c)| taper[r] * taper[c]);
        Self {
            size,
            window,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Offset `(dy, dx)` at which the reference content appears in `target`.
    ///
    /// A target equal to the reference moved down by 2 rows yields `(2.0, 0.0)`.
    pub fn offset(&self, reference: ArrayView2<f64>, target: ArrayView2<f64>) -> (f64, f64) {
        let n = self.size;
        let ref_fft = self.spectrum(reference);
        let tgt_fft = self.spectrum(target);

        let mut cross = Array2::<Complex<f64>>::zeros((n, n));
        for ((c, t), r) in cross.iter_mut().zip(tgt_fft.iter()).zip(ref_fft.iter()) {
            let product = t * r.conj();
            let mag = product.norm();
            *c = if mag > EPSILON {
                product / mag
            } else {
                Complex::new(0.0, 0.0)
            };
        }

        let surface = self.inverse_2d(cross);
        let (peak_row, peak_col) = find_peak(&surface);

        let wrap = |p: usize| -> f64 {
            if p > n / 2 {
                p as f64 - n as f64
            } else {
                p as f64
            }
        };

        let row = |d: isize| surface[[wrap_index(peak_row, d, n), peak_col]];
        let col = |d: isize| surface[[peak_row, wrap_index(peak_col, d, n)]];
        let sub_dy = parabolic_vertex(row(-1), row(0), row(1));
        let sub_dx = parabolic_vertex(col(-1), col(0), col(1));

        let limit = n as f64 / 2.0;
        (
            (wrap(peak_row) + sub_dy).clamp(-limit, limit),
            (wrap(peak_col) + sub_dx).clamp(-limit, limit),
        )
    }

    /// Mean-subtracted, apodized forward 2-D FFT.
    fn spectrum(&self, data: ArrayView2<f64>) -> Array2<Complex<f64>> {
        let mean = data.mean().unwrap_or(0.0);
        let mut work = Array2::from_shape_fn((self.size, self.size), |(r, c)| {
            Complex::new((data[[r, c]] - mean) * self.window[[r, c]], 0.0)
        });
        transform_2d(&mut work, self.forward.as_ref());
        work
    }

    fn inverse_2d(&self, mut data: Array2<Complex<f64>>) -> Array2<f64> {
        transform_2d(&mut data, self.inverse.as_ref());
        let scale = 1.0 / (self.size * self.size) as f64;
        data.mapv(|v| v.re * scale)
    }
}

/// Apply a 1-D transform along rows, then along columns.
fn transform_2d(data: &mut Array2<Complex<f64>>, fft: &dyn Fft<f64>) {
    for mut row in data.rows_mut() {
        let mut buf = row.to_vec();
        fft.process(&mut buf);
        row.iter_mut().zip(buf).for_each(|(dst, v)| *dst = v);
    }
    for mut col in data.columns_mut() {
        let mut buf = col.to_vec();
        fft.process(&mut buf);
        col.iter_mut().zip(buf).for_each(|(dst, v)| *dst = v);
    }
}

/// Flat-topped cosine taper that rolls off over `fraction * size` samples
/// at each end.
fn taper_1d(size: usize, fraction: f64) -> Vec<f64> {
    let edge = (fraction * size as f64).round() as usize;
    if edge == 0 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            let d = i.min(size - 1 - i);
            if d >= edge {
                1.0
            } else {
                let t = (d as f64 + 0.5) / edge as f64;
                0.5 * (1.0 - (std::f64::consts::PI * t).cos())
            }
        })
        .collect()
}

/// First maximum in row-major order.
fn find_peak(surface: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((r, c), &v) in surface.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (r, c);
        }
    }
    best
}

/// Neighbour index on the periodic correlation surface.
fn wrap_index(p: usize, delta: isize, n: usize) -> usize {
    (p as isize + delta).rem_euclid(n as isize) as usize
}

/// Vertex of the parabola through three equally spaced samples, relative to
/// the middle one, limited to half a sample.
fn parabolic_vertex(prev: f64, curr: f64, next: f64) -> f64 {
    let curvature = prev - 2.0 * curr + next;
    if curvature.abs() <= EPSILON {
        return 0.0;
    }
    ((prev - next) / (2.0 * curvature)).clamp(-0.5, 0.5)
}
