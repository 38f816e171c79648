use std::time::Duration;

use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::DonationEvent;

pub struct DonationService;

impl DonationService {
    /// Persists one validated donation event.
    ///
    /// The insert is bounded by `timeout`; an elapsed timeout surfaces as
    /// the same persistence failure as a rejected write. The caller does
    /// not retry.
    pub async fn insert(
        pool: &PgPool,
        timeout: Duration,
        event: &DonationEvent,
    ) -> AppResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO donations (install_id, amount, charity, host, event_time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&event.install_id)
        .bind(event.amount)
        .bind(&event.charity)
        .bind(&event.host)
        .bind(event.event_time.to_rfc3339())
        .execute(pool);

        match tokio::time::timeout(timeout, query).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(AppError::PersistenceTimeout),
        }
    }
}
