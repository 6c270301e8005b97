pub use api_response::*;
pub use files_router::*;
pub use health_router::*;
pub use router::*;

mod api_response;
mod files_router;
mod health_router;
pub mod middlewares;
mod router;
