use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use patrol_inspect::app_state::AppState;
use patrol_inspect::config::AppConfig;
use patrol_inspect::db;
use patrol_inspect::routes;
use patrol_inspect::services::{
    classifier::VisionClient,
    notifier::Notifier,
    storage::ImageStore,
    worker_pool::{WorkerContext, WorkerPool},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing patrol-inspect server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "inspection_jobs_total",
        "Total inspection jobs submitted to the worker pool"
    );
    metrics::describe_counter!(
        "inspection_jobs_completed",
        "Total inspection jobs that reached a terminal status"
    );
    metrics::describe_counter!(
        "inspection_jobs_failed",
        "Total inspection jobs that failed"
    );
    metrics::describe_histogram!(
        "inspection_processing_seconds",
        "Time to classify one inspection job"
    );
    metrics::describe_gauge!(
        "inspection_queue_depth",
        "Jobs waiting in the internal worker channel"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to SQLite database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize services
    tracing::info!("Initializing vision model client");
    let classifier = VisionClient::new(
        &config.dashscope_base_url,
        &config.dashscope_api_key,
        &config.dashscope_model,
        Duration::from_secs(config.classifier_timeout_secs),
    )
    .expect("Failed to initialize vision model client");

    let notifier = Notifier::new(
        &config.web_base_url,
        Duration::from_secs(config.notify_timeout_secs),
    )
    .expect("Failed to initialize notifier");

    let images = ImageStore::new(&config.image_dir);

    // Start the worker pool
    tracing::info!(worker_count = config.worker_count, "Starting worker pool");
    let workers = WorkerPool::spawn(
        config.worker_count,
        WorkerContext {
            db: db_pool.clone(),
            classifier,
            notifier: notifier.clone(),
            images,
        },
    );

    // Create shared application state
    let state = AppState::new(db_pool, workers, notifier);

    // Build API routes
    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB limit

    tracing::info!("Starting patrol-inspect on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
