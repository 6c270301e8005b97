pub mod auth;
pub mod backend;
pub mod config;
pub mod errors;
pub mod health;
pub mod logger;
pub mod ops;
pub mod router;
pub mod service;
pub mod transfer;
pub mod transport;
pub mod utils;
pub mod version;
