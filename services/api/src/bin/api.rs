//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LocalFileStore, OpenRouterCompletionAdapter},
    config::Config,
    error::ApiError,
    web::{
        app_router,
        rate_limit::new_client_rate_limiter,
        rest::ApiDoc,
        state::AppState,
        token::TokenIssuer,
    },
};
use component_forge_core::generation::ComponentGenerator;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(
        "Configuration loaded ({} environment). Starting server...",
        config.environment.as_str()
    );

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let files = Arc::new(LocalFileStore::new(config.upload_dir.clone()).await?);

    let generator = match &config.openrouter_api_key {
        Some(api_key) => {
            let completion = OpenRouterCompletionAdapter::new(
                api_key.clone(),
                &config.completion_api_base,
                config.frontend_url.clone(),
                config.completion_timeout,
            )
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
            info!("Completion API configured at {}", config.completion_api_base);
            Some(ComponentGenerator::new(Arc::new(completion)))
        }
        None => {
            warn!("OPENROUTER_API_KEY is not set; generation requests will fail");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter.clone(),
        files,
        generator,
        config: config.clone(),
        tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_days),
        rate_limiter: new_client_rate_limiter(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        ),
        started_at: Instant::now(),
    });

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = app_router(app_state)?
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // --- 7. Drain ---
    db_adapter.close().await;
    info!("Database pool closed. Bye.");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received, draining in-flight requests");
}
