mod descriptor;
mod name;
mod params;
mod path;
mod response;
mod template;

pub use descriptor::*;
pub use name::*;
pub use params::*;
pub use path::*;
pub use response::{ContentSummary, DecodedResult, FileChecksum, FileStatus, FileType};
pub use template::*;
