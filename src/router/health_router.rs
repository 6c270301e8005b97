use actix_web::web;

use super::*;

pub const HEALTH_CHECK_PATH: &str = "/health";

pub fn configure_health_router(cfg: &mut web::ServiceConfig) {
    cfg.route(HEALTH_CHECK_PATH, web::get().to(health_report));
}

// Backend snapshots keyed by endpoint; unauthenticated.
async fn health_report(state: web::Data<AppState>) -> ApiResponse {
    ApiResponse::success_json(&state.monitor.get_report())
}
