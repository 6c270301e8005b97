mod kvs;
mod proxy;

pub use kvs::*;
pub use proxy::*;
