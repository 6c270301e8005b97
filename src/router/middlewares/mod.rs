mod max_clients;
mod trace;

pub use max_clients::*;
pub use trace::*;
