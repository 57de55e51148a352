//! Inkwell API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use inkwell_api::config::AppConfig;
use inkwell_api::dispatch::LoggingDispatcher;
use inkwell_api::error::AppError;
use inkwell_api::state::AppState;
use inkwell_api::{routes, telemetry};
use inkwell_core::clock::{Clock, SystemClock};
use inkwell_core::rng::{DeterministicRng, StdRngSource};
use inkwell_identity::domain::code::VerificationPolicy;
use inkwell_store::pg_actor_directory::PgActorDirectory;
use inkwell_store::pg_event_repository::PgEventRepository;
use inkwell_store::pg_otp_store::PgOtpStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(environment = %config.environment, "Starting Inkwell API server");
    if config.otp_master_code.is_some() {
        tracing::warn!(
            "OTP bypass mode is active: codes are not delivered and the master code verifies every identifier"
        );
    }

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    // Build application state.
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(StdRngSource::from_os()));
    let app_state = AppState::new(
        clock,
        rng,
        Arc::new(PgEventRepository::new(pool.clone())),
        Arc::new(PgOtpStore::new(pool.clone())),
        Arc::new(PgActorDirectory::new(pool)),
        Arc::new(LoggingDispatcher),
        VerificationPolicy::new(config.otp_master_code.clone()),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    if let Some(provider) = tracer_provider {
        provider
            .shutdown()
            .map_err(|e| AppError::Telemetry(e.to_string()))?;
    }

    Ok(())
}
