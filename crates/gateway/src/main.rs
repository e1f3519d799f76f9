//! VeriDoc API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Authentication and authorization
//! - Document upload and batch submission
//! - Request routing to the analysis pipeline
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use veridoc_common::{
    auth::{JwtManager, JwtSecretProvider},
    config::AppConfig,
    db::{DbPool, Repository},
    errors::AppError,
    metrics::{RequestMetrics, LATENCY_BUCKETS, METRICS_PREFIX, ORACLE_BUCKETS},
    oracle::HttpOracle,
    storage::FsBlobStore,
};
use veridoc_pipeline::{AnalysisPipeline, ReviewService, ValidationGate};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repository: Repository,
    pub storage: Arc<FsBlobStore>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub review: Arc<ReviewService>,
    jwt: Arc<JwtManager>,
}

impl JwtSecretProvider for AppState {
    fn jwt_manager(&self) -> &JwtManager {
        &self.jwt
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting VeriDoc API Gateway v{}", veridoc_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    install_metrics_exporter(&config)?;
    veridoc_common::metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let state = build_state(config.clone(), db)?;

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wire the shared services into the application state
fn build_state(config: Arc<AppConfig>, db: DbPool) -> Result<AppState, AppError> {
    let jwt_secret = config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret is required".to_string(),
        })?;
    let jwt = Arc::new(JwtManager::new(jwt_secret, config.auth.jwt_expiration_secs));

    let storage = Arc::new(FsBlobStore::new(&config.storage)?);
    let oracle = Arc::new(HttpOracle::new(&config.oracle)?);
    let repository = Repository::new(db.clone());
    let gate = ValidationGate::new(&config.validation);

    let pipeline = Arc::new(AnalysisPipeline::new(
        repository.clone(),
        storage.clone(),
        oracle,
        gate,
    ));
    let review = Arc::new(ReviewService::new(
        repository.clone(),
        storage.clone(),
        config.storage.signed_url_ttl_secs,
    ));

    Ok(AppState {
        config,
        db,
        repository,
        storage,
        pipeline,
        review,
        jwt,
    })
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // A full batch of maximum-size files, plus multipart framing overhead
    let body_limit = state.config.validation.max_file_bytes as usize
        * state.config.validation.max_batch_files
        + 1024 * 1024;

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Document endpoints
        .route(
            "/documents",
            post(handlers::documents::upload_document).get(handlers::documents::list_documents),
        )
        .route("/documents/batch", post(handlers::batch::upload_batch))
        .route(
            "/documents/{id}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route(
            "/documents/{id}/retry",
            post(handlers::documents::retry_document),
        )
        .route("/documents/{id}/review", post(handlers::review::decide))
        // Scan result endpoints
        .route(
            "/scan-results/{id}",
            get(handlers::scan_results::get_scan_result),
        )
        .route(
            "/scan-results/{id}/overlay",
            get(handlers::scan_results::get_overlay),
        )
        // Review queue
        .route("/review-queue", get(handlers::review::queue))
        // Notifications
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/{id}/read",
            post(handlers::notifications::mark_read),
        )
        // Signed blob reads
        .route("/blobs/{*path}", get(handlers::blobs::fetch_blob));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(track_request_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Record request count and latency per route template and status.
/// The matched path keeps label cardinality bounded.
async fn track_request_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let tracker = RequestMetrics::start(&method, &endpoint);
    let response = next.run(request).await;
    tracker.finish(response.status().as_u16());

    response
}

/// Install the Prometheus exporter with latency buckets matched to each
/// histogram family
fn install_metrics_exporter(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_port == 0 {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_oracle_request_duration_seconds", METRICS_PREFIX)),
            ORACLE_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_analysis_duration_seconds", METRICS_PREFIX)),
            ORACLE_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .install()?;

    info!(
        port = config.observability.metrics_port,
        "Metrics exporter installed"
    );
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
