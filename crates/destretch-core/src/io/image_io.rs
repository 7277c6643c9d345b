use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{DestretchError, Result};
use crate::frame::Frame;

/// Save a single-plane frame as 16-bit grayscale TIFF.
/// Samples are clamped to [0, 1].
pub fn save_tiff(frame: &Frame, path: &Path) -> Result<()> {
    let plane = single_plane(frame, path)?;
    let (h, w) = plane.dim();

    let pixels: Vec<u16> = plane
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| DestretchError::UnsupportedOutput("TIFF buffer size mismatch".into()))?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a single-plane frame as 8-bit grayscale PNG.
pub fn save_png(frame: &Frame, path: &Path) -> Result<()> {
    let plane = single_plane(frame, path)?;
    let (h, w) = plane.dim();

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in plane.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([(v.clamp(0.0, 1.0) * 255.0) as u8]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Load a grayscale image file into a single-plane frame with values in [0, 1].
pub fn load_image(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = pixel.0[0] as f32 / 65535.0;
    }

    Ok(Frame::from_plane(data))
}

fn single_plane<'a>(frame: &'a Frame, path: &Path) -> Result<ndarray::ArrayView2<'a, f32>> {
    if frame.planes() != 1 {
        return Err(DestretchError::UnsupportedOutput(format!(
            "{} planes cannot be written to '{}'; use a .fits path",
            frame.planes(),
            path.display()
        )));
    }
    Ok(frame.plane(0))
}
