mod monitor;
mod status;

pub use monitor::*;
pub use status::*;
