use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Utc;

use donatrack::config;
use donatrack::db;
use donatrack::routes;
use donatrack::services::RateLimiter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load configuration (fail fast on missing required variables)
    let config = config::Config::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("Starting Donatrack server on {}:{}", config.host, config.port);

    if config.security.api_secret.is_some() {
        log::info!("Shared-secret check enabled for submissions");
    } else {
        log::warn!("API_SECRET not set, submissions are unauthenticated");
    }

    // Create database pool
    let db_pool = db::create_pool(&config.database).await.map_err(|e| {
        log::error!("Database pool error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    // Run migrations
    db::run_migrations(&db_pool).await.map_err(|e| {
        log::error!("Migration error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    // Rate limiter is constructed once and shared across workers
    let limiter = web::Data::new(RateLimiter::new(&config.rate_limit));

    // Background sweep keeps the limiter map bounded to recently active keys
    let sweeper = limiter.clone();
    let sweep_interval = config.rate_limit.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick fires immediately, skip it
        loop {
            ticker.tick().await;
            let removed = sweeper.sweep_expired(Utc::now());
            if removed > 0 {
                log::debug!(
                    "Rate limiter sweep removed {} expired entries ({} remain)",
                    removed,
                    sweeper.tracked_keys()
                );
            }
        }
    });

    // Clone values for the closure
    let host = config.host.clone();
    let port = config.port;

    let server = HttpServer::new(move || {
        // CORS configuration - permissive for telemetry ingestion.
        // The extension posts from whatever site the user is on, so there is
        // no fixed origin to pin; the shared secret is the actual gate.
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::HeaderName::from_static("x-api-secret"),
            ])
            .max_age(3600);

        App::new()
            // Share database pool, config and limiter with all handlers
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(limiter.clone())
            // Middleware
            .wrap(middleware::Logger::default())
            .wrap(cors)
            // Health check routes
            .configure(routes::health::configure)
            // Submission routes
            .configure(routes::donations::configure)
    })
    .bind((host.as_str(), port))?
    .shutdown_timeout(30)
    .run();

    // Spawn graceful shutdown handler
    let server_handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    server.await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {}", e);
                // Wait forever if signal handler fails
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
