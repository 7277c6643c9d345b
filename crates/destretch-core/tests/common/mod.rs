#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use destretch_core::error::{DestretchError, Result};
use destretch_core::frame::{Frame, IndexConvention};
use destretch_core::io::{ImageSource, OutputSink};
use destretch_core::kernel::{
    apply_displacement, DestretchParams, DestretchResult, RegistrationKernel,
};
use ndarray::Array2;

/// A frame filled with one value.
pub fn constant_frame(h: usize, w: usize, value: f32) -> Frame {
    Frame::from_plane(Array2::from_elem((h, w), value))
}

/// A frame with a gentle ramp so that no two samples are equal.
pub fn ramp_frame(h: usize, w: usize, base: f32) -> Frame {
    Frame::from_plane(Array2::from_shape_fn((h, w), |(r, c)| {
        base + 0.01 * r as f32 + 0.001 * c as f32
    }))
}

/// Deterministic field of Gaussian blobs, every blob displaced by `(dy, dx)`.
///
/// Two calls with the same size and different shifts give an exactly
/// translated scene.
pub fn blob_field(h: usize, w: usize, dy: f64, dx: f64) -> Frame {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    let blobs: Vec<(f64, f64, f64)> = (0..(h * w / 48))
        .map(|_| (next() * h as f64, next() * w as f64, 0.5 + next()))
        .collect();

    let sigma2 = 2.0 * 2.0_f64.powi(2);
    Frame::from_plane(Array2::from_shape_fn((h, w), |(r, c)| {
        blobs
            .iter()
            .map(|&(by, bx, amp)| {
                let ry = r as f64 - (by + dy);
                let rx = c as f64 - (bx + dx);
                amp * (-(ry * ry + rx * rx) / sigma2).exp()
            })
            .sum::<f64>() as f32
    }))
}

/// Build a primary-HDU FITS file from raw big-endian sample bytes.
///
/// `axes` are NAXIS1..NAXISn (fastest first); `extra` cards are inserted
/// verbatim as `KEYWORD = value`.
pub fn build_fits(bitpix: i32, axes: &[usize], data: &[u8], extra: &[(&str, &str)]) -> Vec<u8> {
    let mut cards = vec![
        format!("{:<8}= {:>20}", "SIMPLE", "T"),
        format!("{:<8}= {:>20}", "BITPIX", bitpix),
        format!("{:<8}= {:>20}", "NAXIS", axes.len()),
    ];
    for (i, n) in axes.iter().enumerate() {
        cards.push(format!("{:<8}= {:>20}", format!("NAXIS{}", i + 1), n));
    }
    for (key, value) in extra {
        cards.push(format!("{:<8}= {:>20}", key, value));
    }
    cards.push("END".to_string());

    let mut buf = Vec::new();
    for card in cards {
        let mut bytes = card.into_bytes();
        bytes.resize(80, b' ');
        buf.extend_from_slice(&bytes);
    }
    buf.resize(buf.len().div_ceil(2880) * 2880, b' ');
    buf.extend_from_slice(data);
    buf.resize(buf.len().div_ceil(2880) * 2880, 0);
    buf
}

/// Numbered fake paths `frame<i>.fits`.
pub fn paths(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("frame{i}.fits"))).collect()
}

/// In-memory image source that counts loads.
pub struct MemorySource {
    frames: HashMap<PathBuf, Frame>,
    loads: Mutex<Vec<PathBuf>>,
}

impl MemorySource {
    pub fn new(entries: Vec<(PathBuf, Frame)>) -> Self {
        Self {
            frames: entries.into_iter().collect(),
            loads: Mutex::new(Vec::new()),
        }
    }

    /// `n` constant frames whose value equals their index.
    pub fn indexed(n: usize, h: usize, w: usize) -> (Vec<PathBuf>, Self) {
        let paths = paths(n);
        let entries = paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), constant_frame(h, w, i as f32)))
            .collect();
        (paths, Self::new(entries))
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().unwrap().len()
    }
}

impl ImageSource for MemorySource {
    fn load(
        &self,
        path: &Path,
        _convention: IndexConvention,
        _plane: Option<usize>,
    ) -> Result<Frame> {
        self.loads.lock().unwrap().push(path.to_path_buf());
        self.frames.get(path).cloned().ok_or_else(|| {
            DestretchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        })
    }
}

/// Sink that keeps every write in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub writes: Vec<(PathBuf, Frame)>,
}

impl OutputSink for RecordingSink {
    fn write(&mut self, path: &Path, frame: &Frame) -> Result<()> {
        self.writes.push((path.to_path_buf(), frame.clone()));
        Ok(())
    }
}

/// One observed `register` call.
#[derive(Clone, Debug)]
pub struct KernelCall {
    pub frame: Frame,
    pub reference: Frame,
}

/// Deterministic stand-in kernel: the corrected frame is the input plus
/// one, and every control point moves by (+0.5, -0.25). Offset fields
/// handed to `apply_offsets` are recorded before warping.
#[derive(Default)]
pub struct MockKernel {
    pub calls: Mutex<Vec<KernelCall>>,
    pub applied: Mutex<Vec<Frame>>,
}

impl MockKernel {
    pub fn calls(&self) -> Vec<KernelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<Frame> {
        self.applied.lock().unwrap().clone()
    }
}

impl RegistrationKernel for MockKernel {
    fn register(
        &self,
        frame: &Frame,
        reference: &Frame,
        kernel_sizes: &[usize],
    ) -> Result<DestretchResult> {
        if frame.data.shape() != reference.data.shape() {
            return Err(DestretchError::RegistrationPrecondition(
                "shape mismatch".into(),
            ));
        }
        self.calls.lock().unwrap().push(KernelCall {
            frame: frame.clone(),
            reference: reference.clone(),
        });

        let size = kernel_sizes.last().copied().unwrap_or(4);
        let params = DestretchParams::for_frame(frame.resolution(), size, 0.0)?;
        let rdisp = params.positions();
        let mut disp = rdisp.clone();
        disp.data
            .index_axis_mut(ndarray::Axis(0), 0)
            .mapv_inplace(|v| v + 0.5);
        disp.data
            .index_axis_mut(ndarray::Axis(0), 1)
            .mapv_inplace(|v| v - 0.25);

        Ok(DestretchResult {
            corrected: Frame::new(frame.data.mapv(|v| v + 1.0)),
            displacement_sum: Some(disp),
            reference_displacement_sum: Some(rdisp),
            params,
        })
    }

    fn apply_offsets(
        &self,
        frame: &Frame,
        offsets: &Frame,
        kernel_size: usize,
    ) -> Result<DestretchResult> {
        self.applied.lock().unwrap().push(offsets.clone());
        let params = DestretchParams::for_frame(frame.resolution(), kernel_size, 0.0)?;
        Ok(DestretchResult {
            corrected: apply_displacement(frame, &params, offsets)?,
            displacement_sum: None,
            reference_displacement_sum: None,
            params,
        })
    }
}
