//! Room Service
//!
//! Serves the health, metrics and meeting-end callback endpoints and runs the
//! server health checker.
//!
//! # Startup
//!
//! 1. Initialize tracing (JSON when `LOG_FORMAT=json`)
//! 2. Install the Prometheus recorder
//! 3. Load configuration
//! 4. Connect to Postgres and run migrations
//! 5. Choose the lock provider (Redis when `REDIS_URL` is set)
//! 6. Spawn the server health checker
//! 7. Serve HTTP until SIGINT/SIGTERM, then drain

use room_service::config::Config;
use room_service::locks::{LocalLockProvider, LockProvider, RedisLockProvider};
use room_service::observability::metrics::init_metrics_recorder;
use room_service::repositories::{PgMeetingRepository, PgRoomRepository, PgServerRepository};
use room_service::routes::{self, AppState};
use room_service::services::{BbbClient, CallbackSigner, LifecycleConfig, MeetingLifecycle};
use room_service::tasks::{start_server_health_checker, ServerHealthChecker};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_service=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Room Service");

    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        public_url = %config.public_url,
        distributed_locks = config.redis_url.is_some(),
        health_check_interval_seconds = config.server_health_check_interval.as_secs(),
        "Configuration loaded successfully"
    );

    info!("Connecting to database...");
    let db_url_with_timeout = add_query_timeout(&config.database_url, 5);
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url_with_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    let locks: Arc<dyn LockProvider> = match &config.redis_url {
        Some(url) => Arc::new(RedisLockProvider::connect(url).await?),
        None => {
            warn!("REDIS_URL not set, start locks only exclude requests within this process");
            Arc::new(LocalLockProvider::new())
        }
    };

    let conferencing = Arc::new(BbbClient::new(
        config.server_connect_timeout,
        config.server_request_timeout,
        config.checksum_algorithm,
    )?);
    let rooms = Arc::new(PgRoomRepository::new(db_pool.clone()));
    let meetings = Arc::new(PgMeetingRepository::new(db_pool.clone()));
    let servers = Arc::new(PgServerRepository::new(db_pool));

    let lifecycle = Arc::new(MeetingLifecycle::new(
        rooms.clone(),
        meetings.clone(),
        servers.clone(),
        conferencing.clone(),
        locks,
        CallbackSigner::new(config.app_key_bytes(), config.public_url.clone()),
        LifecycleConfig::from_config(&config),
    ));

    let shutdown_token = CancellationToken::new();

    let checker = ServerHealthChecker::new(
        servers,
        meetings,
        conferencing,
        config.server_offline_after_failures,
        config.server_request_timeout,
    );
    let health_task = tokio::spawn(start_server_health_checker(
        checker,
        config.server_health_check_interval,
        shutdown_token.child_token(),
    ));

    let bind_address = config.bind_address.clone();
    let drain_period = config.drain_period;

    let state = Arc::new(AppState {
        config,
        lifecycle,
        rooms,
    });
    let app = routes::build_routes(state, prometheus_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Room Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_period))
    .await?;

    shutdown_token.cancel();
    if let Err(e) = health_task.await {
        warn!(error = %e, "Server health checker task failed");
    }

    info!("Room Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is over.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain_period.as_secs());
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }
}

/// Adds statement_timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-c%20statement_timeout%3D{timeout_secs}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_query_timeout() {
        assert_eq!(
            add_query_timeout("postgres://db/rooms", 5),
            "postgres://db/rooms?options=-c%20statement_timeout%3D5s"
        );
        assert_eq!(
            add_query_timeout("postgres://db/rooms?sslmode=require", 5),
            "postgres://db/rooms?sslmode=require&options=-c%20statement_timeout%3D5s"
        );
    }
}
