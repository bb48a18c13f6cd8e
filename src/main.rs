use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedback_server::db::{create_pool, run_migrations};
use feedback_server::storage::{
    load_sdk_config, CredentialIssuer, S3ObjectStore, StsCredentialService,
};
use feedback_server::{routes, AppState, Config, FeedbackStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedback_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Feedback Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // Create database connection pool and schema
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;

    // Cloud clients share one SDK configuration
    let sdk_config = load_sdk_config(&config.s3_region).await;
    let credential_service = Arc::new(StsCredentialService::new(&sdk_config, &config));
    let object_store = Arc::new(S3ObjectStore::new(&sdk_config, &config));

    // Configure CORS
    let origins = config
        .allowed_origins
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<HeaderValue>, _>>()
        .map_err(|e| anyhow::anyhow!("Invalid ALLOWED_ORIGINS: {}", e))?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    // Create app state
    let state = AppState::new(
        FeedbackStore::new(pool, config.s3_public_base_url.clone()),
        CredentialIssuer::new(credential_service, &config),
        object_store,
        config.clone(),
    );

    // Build router
    let app = routes::api_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
