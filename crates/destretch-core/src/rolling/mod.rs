//! Windowed order statistics over a frame stream.

mod aggregator;
mod median;
mod window;

pub use aggregator::{Aggregate, RollingAggregator};
pub use median::median_of;
pub use window::{EdgePolicy, Margins, Window};
