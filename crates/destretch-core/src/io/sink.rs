use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::frame::Frame;

use super::fits_writer::write_fits;
use super::image_io::{save_png, save_tiff};

/// Writes one numbered artifact, overwriting any existing file.
pub trait OutputSink {
    fn write(&mut self, path: &Path, frame: &Frame) -> Result<()>;
}

/// Writes FITS, or TIFF/PNG when the path says so.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSink;

impl OutputSink for FileSink {
    fn write(&mut self, path: &Path, frame: &Frame) -> Result<()> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tiff" | "tif") => save_tiff(frame, path),
            Some("png") => save_png(frame, path),
            _ => write_fits(path, frame),
        }
    }
}

/// Fixed-width output naming: `<dir>/<stem><index><suffix>`.
///
/// The index is zero-padded to the digit count of the sequence length, so
/// lexical and numeric order agree.
#[derive(Clone, Debug)]
pub struct OutputNaming {
    pub dir: PathBuf,
    pub stem: String,
    pub suffix: String,
    pub digits: usize,
}

impl OutputNaming {
    pub fn new(dir: &Path, stem: &str, suffix: &str, total: usize) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            suffix: suffix.to_string(),
            digits: total.to_string().len(),
        }
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!(
            "{}{:0width$}{}",
            self.stem,
            index,
            self.suffix,
            width = self.digits
        ))
    }
}

/// Hands successive frames to a sink under consecutive indices and keeps
/// the list of written paths.
pub struct NumberedWriter<'a> {
    naming: OutputNaming,
    sink: &'a mut dyn OutputSink,
    written: Vec<PathBuf>,
}

impl<'a> NumberedWriter<'a> {
    pub fn new(naming: OutputNaming, sink: &'a mut dyn OutputSink) -> Self {
        Self {
            naming,
            sink,
            written: Vec::new(),
        }
    }

    pub fn write_next(&mut self, frame: &Frame) -> Result<PathBuf> {
        let path = self.naming.path(self.written.len());
        self.sink.write(&path, frame)?;
        debug!(path = %path.display(), "Wrote frame");
        self.written.push(path.clone());
        Ok(path)
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.written
    }
}
