pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod kernel;
pub mod pipeline;
pub mod reference;
pub mod rolling;
pub mod validate;
