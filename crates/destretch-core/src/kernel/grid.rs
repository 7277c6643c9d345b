use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{DestretchError, Result};
use crate::frame::{Frame, Resolution};

/// Smallest subframe that still leaves a 3x3 neighbourhood around the
/// correlation peak.
const MIN_KERNEL_SIZE: usize = 4;

/// Control-point grid geometry for one kernel size.
///
/// Subframes are `kernel_size` pixels square and overlap by half: control
/// points sit `spacing = kernel_size / 2` apart, starting at `origin`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DestretchParams {
    pub kernel_size: usize,
    pub spacing: usize,
    /// Row of the first control point.
    pub origin_y: usize,
    /// Column of the first control point.
    pub origin_x: usize,
    /// Control points along y.
    pub rows: usize,
    /// Control points along x.
    pub cols: usize,
    /// Fraction of each subframe edge tapered before correlation.
    pub apodization: f64,
}

impl DestretchParams {
    pub fn for_frame(resolution: Resolution, kernel_size: usize, apodization: f64) -> Result<Self> {
        if kernel_size < MIN_KERNEL_SIZE {
            return Err(DestretchError::RegistrationPrecondition(format!(
                "kernel size {kernel_size} is below the minimum of {MIN_KERNEL_SIZE}"
            )));
        }
        if kernel_size > resolution.height || kernel_size > resolution.width {
            return Err(DestretchError::RegistrationPrecondition(format!(
                "kernel size {kernel_size} exceeds frame {resolution}"
            )));
        }

        let spacing = kernel_size / 2;
        let count = |extent: usize| (extent - kernel_size) / spacing + 1;

        Ok(Self {
            kernel_size,
            spacing,
            origin_y: kernel_size / 2,
            origin_x: kernel_size / 2,
            rows: count(resolution.height),
            cols: count(resolution.width),
            apodization,
        })
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Centre (row, col) of control point `(i, j)`.
    pub fn center(&self, i: usize, j: usize) -> (usize, usize) {
        (self.origin_y + i * self.spacing, self.origin_x + j * self.spacing)
    }

    /// Top-left corner of the subframe around control point `(i, j)`.
    pub fn subframe_origin(&self, i: usize, j: usize) -> (usize, usize) {
        let (cy, cx) = self.center(i, j);
        let half = self.kernel_size / 2;
        (cy - half, cx - half)
    }

    pub fn row_centers(&self) -> Vec<usize> {
        (0..self.rows).map(|i| self.origin_y + i * self.spacing).collect()
    }

    pub fn col_centers(&self) -> Vec<usize> {
        (0..self.cols).map(|j| self.origin_x + j * self.spacing).collect()
    }

    /// Control-point positions as a (2, rows, cols) field: x then y.
    pub fn positions(&self) -> Frame {
        let mut data = Array3::<f32>::zeros((2, self.rows, self.cols));
        for i in 0..self.rows {
            for j in 0..self.cols {
                let (cy, cx) = self.center(i, j);
                data[[0, i, j]] = cx as f32;
                data[[1, i, j]] = cy as f32;
            }
        }
        Frame::new(data)
    }
}
