use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use fee_oracle::{
    config::Config,
    handlers::*,
    metrics,
    services::*,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting fee-oracle v{}", env!("CARGO_PKG_VERSION"));

    metrics::register_metrics();

    // Initialize services
    let ethereum = Arc::new(EthereumSource::connect(&config.rpc_url).await?);
    let store = Arc::new(ModelStore::new());

    let source: Arc<dyn BlockSource> = ethereum.clone();
    let fetcher = RangeFetcher::new(
        source.clone(),
        FetchPolicy {
            concurrency: config.fetch_max_concurrency,
            max_retries: config.fetch_retries,
            initial_backoff: Duration::from_millis(config.fetch_backoff_ms),
        },
    );
    let training = Arc::new(TrainingService::new(
        source,
        fetcher,
        store.clone(),
        config.block_window,
        config.block_step,
    ));

    // Bootstrap training; the server starts either way and serves the
    // observed base fee until a model is available.
    match training.train().await {
        Ok(report) => tracing::info!(
            "bootstrap training finished: samples={} mse={:?} outcome={}",
            report.samples,
            report.mse,
            report.outcome
        ),
        Err(e) => tracing::error!("bootstrap training failed: {}", e),
    }

    // Build application state
    let app_state = AppState {
        ethereum: ethereum.clone(),
        store: store.clone(),
        training: training.clone(),
        default_priority_gwei: config.default_priority_gwei,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(export_metrics))
        .route("/recommend-fee", get(recommend_fee))
        .route("/network", get(get_network))
        .route("/train", post(trigger_train))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");
    tracing::info!("Shutting down gracefully...");
}
