use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A single frame of a sequence.
///
/// Samples are stored as a stack of planes, shape = (planes, height, width).
/// A plain 2-D image is a stack with one plane.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub data: Array3<f32>,
}

impl Frame {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Wrap a single 2-D plane.
    pub fn from_plane(plane: Array2<f32>) -> Self {
        Self {
            data: plane.insert_axis(Axis(0)),
        }
    }

    pub fn planes(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    /// The trailing (height, width) pair that must stay uniform across a sequence.
    pub fn resolution(&self) -> Resolution {
        Resolution {
            height: self.height(),
            width: self.width(),
        }
    }

    pub fn plane(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![index, .., ..])
    }

    pub fn mean(&self) -> f64 {
        let n = self.data.len();
        if n == 0 {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / n as f64
    }

    /// Sum of all samples, logged as a cheap fingerprint of a reference.
    pub fn checksum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// Subtract the frame mean from every sample.
    pub fn subtract_mean(&mut self) {
        let mean = self.mean() as f32;
        self.data.mapv_inplace(|v| v - mean);
    }
}

/// The (height, width) pair fixed by the first frame of a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub height: usize,
    pub width: usize,
}

impl Resolution {
    pub fn as_tuple(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis order of a stored sample array, slowest-varying axis first.
///
/// `t` is the plane (time/stack) axis, `y` the row axis, `x` the column
/// axis. Loaded data is permuted to the canonical `(t, y, x)` order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexConvention {
    #[default]
    Tyx,
    Yxt,
    Xyt,
}

impl std::fmt::Display for IndexConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tyx => write!(f, "TYX"),
            Self::Yxt => write!(f, "YXT"),
            Self::Xyt => write!(f, "XYT"),
        }
    }
}
