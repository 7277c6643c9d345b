use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DestretchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Resolution mismatch for '{}': expected {}x{}, found {}x{}",
        path.display(),
        expected.1,
        expected.0,
        found.1,
        found.0
    )]
    ResolutionMismatch {
        path: PathBuf,
        /// (height, width) fixed by the first frame.
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Registration precondition violated: {0}")]
    RegistrationPrecondition(String),

    #[error("Plane {index} out of range (total: {total})")]
    PlaneOutOfRange { index: usize, total: usize },

    #[error("Unsupported output: {0}")]
    UnsupportedOutput(String),

    #[error("Empty frame sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, DestretchError>;
