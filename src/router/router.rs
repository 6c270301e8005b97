use std::sync::Arc;
use std::time::Duration;

use actix_web::web;

use super::*;
use crate::auth::AuthProvider;
use crate::health::HealthMonitor;
use crate::service::ProxyService;

/// Shared by every handler through `web::Data`.
pub struct AppState {
    pub service: Arc<ProxyService>,
    pub auth: Arc<dyn AuthProvider>,
    pub monitor: Arc<HealthMonitor>,
    // Upper bound for a whole download, including the copy to the client.
    pub download_deadline: Duration,
}

// Configure server http handler.
pub fn configure_server_handler(cfg: &mut web::ServiceConfig) {
    configure_health_router(cfg);
    configure_files_router(cfg);
}
