use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::RawDonationEvent;
use crate::services::{validate, Decision, DonationService, RateLimiter, ValidationError};

const API_SECRET_HEADER: &str = "x-api-secret";

/// Response for an accepted submission
#[derive(serde::Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
}

/// POST /events/donation
/// Donation telemetry submission endpoint for the browser extension.
pub async fn submit_donation(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    limiter: web::Data<RateLimiter>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    // 0. Shared-secret gate, when the deployment configured one
    if let Some(secret) = &config.security.api_secret {
        let provided = req
            .headers()
            .get(API_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(secret.as_str()) {
            return Err(AppError::Unauthorized);
        }
    }

    // 1. Parse the body leniently: field typing is the validator's job,
    //    only non-JSON is rejected here
    let raw: RawDonationEvent =
        serde_json::from_slice(&body).map_err(|_| ValidationError::InvalidBody)?;

    // 2. Rate-limit gate, before validation (fail fast). The key comes from
    //    the raw payload's installId, falling back to the caller address.
    let remote_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(|s| s.to_string());
    let key = RateLimiter::key_for(raw.install_id_str(), remote_addr.as_deref());

    if let Decision::Limited { retry_after } = limiter.check(&key) {
        log::warn!("Rate limit exceeded for {}: retry_after={}s", key, retry_after);
        return Err(AppError::RateLimited { retry_after });
    }

    // 3. Validate and normalize
    let event = validate(&raw, Utc::now())?;

    // 4. Persist; exactly one insert per accepted request
    DonationService::insert(pool.get_ref(), config.database.insert_timeout, &event).await?;

    log::debug!(
        "Accepted donation from {} for {} on {}",
        event.install_id,
        event.charity,
        event.host
    );

    Ok(HttpResponse::Ok().json(SubmitResponse { ok: true }))
}

/// OPTIONS for CORS preflight (handled by middleware, but kept for explicit routing)
pub async fn options() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Configures the donation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("/donation", web::post().to(submit_donation))
            .route(
                "/donation",
                web::method(actix_web::http::Method::OPTIONS).to(options),
            ),
    );
}
