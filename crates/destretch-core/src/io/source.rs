use std::path::Path;

use ndarray::{Array3, ArrayD, Axis, Ix2, Ix3};

use crate::error::{DestretchError, Result};
use crate::frame::{Frame, IndexConvention};

use super::fits::FitsReader;
use super::image_io::load_image;

/// Loads one frame of a sequence.
///
/// `plane` selects one canonical plane of a stacked container; `None`
/// returns the full stack.
pub trait ImageSource: Send + Sync {
    fn load(&self, path: &Path, convention: IndexConvention, plane: Option<usize>)
        -> Result<Frame>;
}

/// Reads frames from disk, choosing the decoder from the file extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSource;

impl ImageSource for FileSource {
    fn load(
        &self,
        path: &Path,
        convention: IndexConvention,
        plane: Option<usize>,
    ) -> Result<Frame> {
        let data = if is_fits(path) {
            let raw = FitsReader::open(path)?.read_array()?;
            canonicalize(raw, convention)?
        } else {
            load_image(path)?.data
        };
        select_plane(data, plane)
    }
}

pub fn is_fits(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("fits" | "fit" | "fts")
    )
}

/// Permute a stored array into canonical `(plane, row, col)` order.
pub fn canonicalize(raw: ArrayD<f32>, convention: IndexConvention) -> Result<Array3<f32>> {
    let shape_err = |e: ndarray::ShapeError| DestretchError::InvalidFits(e.to_string());
    let canonical = match raw.ndim() {
        2 => {
            let plane = raw.into_dimensionality::<Ix2>().map_err(shape_err)?;
            let plane = match convention {
                IndexConvention::Tyx | IndexConvention::Yxt => plane,
                IndexConvention::Xyt => plane.reversed_axes(),
            };
            plane.insert_axis(Axis(0))
        }
        3 => {
            let stack = raw.into_dimensionality::<Ix3>().map_err(shape_err)?;
            match convention {
                IndexConvention::Tyx => stack,
                IndexConvention::Yxt => stack.permuted_axes([2, 0, 1]),
                IndexConvention::Xyt => stack.permuted_axes([2, 1, 0]),
            }
        }
        n => {
            return Err(DestretchError::InvalidFits(format!(
                "Expected a 2-D or 3-D array, found {n} axes"
            )))
        }
    };
    Ok(canonical.as_standard_layout().into_owned())
}

/// Keep one plane of a stack, or the whole stack when `plane` is `None`.
pub fn select_plane(data: Array3<f32>, plane: Option<usize>) -> Result<Frame> {
    match plane {
        None => Ok(Frame::new(data)),
        Some(index) => {
            let total = data.shape()[0];
            if index >= total {
                return Err(DestretchError::PlaneOutOfRange { index, total });
            }
            Ok(Frame::from_plane(data.index_axis(Axis(0), index).to_owned()))
        }
    }
}
