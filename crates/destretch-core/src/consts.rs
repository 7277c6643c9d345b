/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum control-point count to correlate subframes in parallel.
pub const PARALLEL_CONTROL_POINT_THRESHOLD: usize = 4;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;

/// Default kernel sizes, coarse to fine.
pub const DEFAULT_KERNEL_SIZES: [usize; 2] = [64, 32];

/// Default number of frames on each side of a rolling window.
pub const DEFAULT_MARGIN: i64 = 5;

/// Fraction of each subframe edge tapered by the apodization window.
pub const DEFAULT_APODIZATION_FRACTION: f64 = 0.08;

/// Elapsed-time value at which the reported unit steps up
/// (seconds to minutes, minutes to hours).
pub const ELAPSED_UNIT_THRESHOLD: f64 = 120.0;

/// FITS logical record length in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card length in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// File suffix of written frames.
pub const FITS_SUFFIX: &str = ".fits";

/// File suffix of per-frame offset fields.
pub const OFFSETS_SUFFIX: &str = ".off.fits";

/// File suffix of rolling-aggregate fields.
pub const AVERAGE_SUFFIX: &str = ".avg.fits";

/// File stem of registered frames.
pub const DESTRETCHED_STEM: &str = "destretched";

/// File stem of per-frame offset fields.
pub const OFFSETS_STEM: &str = "offsets";
