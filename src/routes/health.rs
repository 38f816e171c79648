use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Serialize;

use crate::db::{self, DbPool};

#[derive(Serialize)]
pub struct LivenessResponse {
    ok: bool,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    ok: bool,
    checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    database: &'static str,
}

/// Liveness check - is the process running?
/// Always returns `200 {"ok": true}`.
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(LivenessResponse { ok: true })
}

/// Readiness check - is the service ready to handle requests?
/// Returns 200 if the donation store is reachable, 503 otherwise.
pub async fn readiness(pool: web::Data<DbPool>) -> HttpResponse {
    let (db_healthy, db_status, http_status) = match db::health_check(pool.get_ref()).await {
        Ok(()) => (true, "ok", StatusCode::OK),
        Err(e) => {
            log::warn!("Readiness probe failed: {}", e);
            (false, "error", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    HttpResponse::build(http_status).json(ReadinessResponse {
        ok: db_healthy,
        checks: ReadinessChecks {
            database: db_status,
        },
    })
}

/// Configures the health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(liveness))
            .route("/ready", web::get().to(readiness)),
    );
}
