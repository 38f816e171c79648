use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::services::ValidationError;

/// JSON error response structure.
/// Every failure the extension can see has this shape.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limited")]
    RateLimited {
        /// Seconds until the caller's window resets
        retry_after: u64,
    },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("DB insert failed")]
    Database(#[from] sqlx::Error),

    #[error("DB insert failed")]
    PersistenceTimeout,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PersistenceTimeout => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal fault details stay in the server log, never in the body
        match self {
            AppError::Database(source) => log::error!("Donation insert failed: {}", source),
            AppError::PersistenceTimeout => log::error!("Donation insert timed out"),
            _ => {}
        }

        let mut builder = HttpResponse::build(self.status_code());

        if let AppError::RateLimited { retry_after } = self {
            builder.insert_header(("Retry-After", retry_after.to_string()));
        }

        builder.json(ErrorResponse {
            ok: false,
            error: self.to_string(),
        })
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
