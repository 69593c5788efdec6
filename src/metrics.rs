//! Prometheus metrics for the fee pipeline.
//!
//! Observations are fire-and-forget: a failed registration or encode is
//! logged and never fails the operation being measured.

use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Time to fetch and prepare a block window.
    pub static ref FETCH_BLOCKS_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pipeline_fetch_blocks_seconds",
            "Time to fetch and prepare blocks"
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0])
    )
    .expect("metric creation failed");

    /// Model training time.
    pub static ref TRAIN_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("pipeline_train_seconds", "Model training time (seconds)")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0])
    )
    .expect("metric creation failed");

    /// Inference latency.
    pub static ref INFERENCE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("pipeline_inference_ms", "Inference latency (ms)")
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0])
    )
    .expect("metric creation failed");

    /// Last training loss (MSE).
    pub static ref MODEL_LOSS: Gauge = Gauge::new(
        "pipeline_last_train_loss",
        "Last training loss (MSE)"
    )
    .expect("metric creation failed");

    /// Latest observed base fee (gwei).
    pub static ref LAST_BASE_FEE: Gauge = Gauge::new(
        "chain_last_base_fee_gwei",
        "Latest observed base fee (gwei)"
    )
    .expect("metric creation failed");
}

/// Register all pipeline metrics with the registry. Safe to call once at
/// startup; duplicate registrations are logged and skipped.
pub fn register_metrics() {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(FETCH_BLOCKS_DURATION.clone()),
        Box::new(TRAIN_DURATION.clone()),
        Box::new(INFERENCE_DURATION.clone()),
        Box::new(MODEL_LOSS.clone()),
        Box::new(LAST_BASE_FEE.clone()),
    ];

    for metric in metrics {
        if let Err(e) = REGISTRY.register(metric) {
            tracing::warn!("metric registration skipped: {}", e);
        }
    }
}

/// Encode all registered metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
