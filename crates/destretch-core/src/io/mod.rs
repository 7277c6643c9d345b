pub mod fits;
pub mod fits_writer;
pub mod image_io;
pub mod sink;
pub mod source;

pub use fits::{fits_info, FitsInfo, FitsReader};
pub use sink::{FileSink, NumberedWriter, OutputNaming, OutputSink};
pub use source::{FileSource, ImageSource};
