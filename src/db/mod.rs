use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Type alias for the PostgreSQL connection pool backing the donation sink
pub type DbPool = PgPool;

/// Creates the connection pool for the donation store
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    log::info!("Connecting to the donation store...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // received_at defaults to now() server-side and is compared
                // against client-reported event times; keep both in UTC
                sqlx::query("SET timezone = 'UTC'").execute(conn).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await?;

    log::info!(
        "Donation store pool ready (max: {}, min: {}, insert timeout: {:?})",
        config.max_connections,
        config.min_connections,
        config.insert_timeout
    );

    Ok(pool)
}

/// Applies the donations schema migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("Applying donations schema migrations...");

    sqlx::migrate!("./migrations").run(pool).await?;

    log::info!("Donations schema is up to date");
    Ok(())
}

/// Probes the donation store. The error is returned rather than swallowed
/// so the readiness route can log what is actually wrong.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
