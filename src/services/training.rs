use crate::{
    error::{FeeOracleError, FitError},
    metrics,
    models::TrainReport,
    services::{blocks_to_dataset, fit_linear_regression, BlockSource, ModelStore, RangeFetcher},
};
use std::sync::Arc;
use std::time::Instant;

/// Runs the full fetch → dataset → fit → store sequence. Invoked once at
/// bootstrap and again whenever a refresh is requested.
pub struct TrainingService {
    source: Arc<dyn BlockSource>,
    fetcher: RangeFetcher,
    store: Arc<ModelStore>,
    block_window: u64,
    block_step: u64,
}

impl TrainingService {
    pub fn new(
        source: Arc<dyn BlockSource>,
        fetcher: RangeFetcher,
        store: Arc<ModelStore>,
        block_window: u64,
        block_step: u64,
    ) -> Self {
        Self {
            source,
            fetcher,
            store,
            block_window,
            block_step,
        }
    }

    /// Refresh the model from the latest block window. A failed fit is a
    /// non-fatal outcome: the report says why and any previous model stays
    /// in place.
    pub async fn train(&self) -> Result<TrainReport, FeeOracleError> {
        let end_height = self.source.current_height().await?;
        let blocks = self
            .fetcher
            .fetch_range(end_height, self.block_window, self.block_step)
            .await?;
        let samples = blocks_to_dataset(&blocks);

        let started = Instant::now();
        let fit = fit_linear_regression(&samples);
        metrics::TRAIN_DURATION.observe(started.elapsed().as_secs_f64());

        match fit {
            Ok(model) => {
                metrics::MODEL_LOSS.set(model.mse);
                tracing::info!(
                    "model trained: samples={} mse={:.6}",
                    samples.len(),
                    model.mse
                );

                let report = TrainReport {
                    samples: samples.len(),
                    mse: Some(model.mse),
                    model_ready: true,
                    outcome: "trained".to_string(),
                };
                self.store.set(Some(Arc::new(model))).await;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("training produced no model: {}", e);

                let outcome = match e {
                    FitError::InsufficientData => "insufficient-data",
                    FitError::SingularSystem => "singular-system",
                };
                Ok(TrainReport {
                    samples: samples.len(),
                    mse: None,
                    model_ready: self.store.get().await.is_some(),
                    outcome: outcome.to_string(),
                })
            }
        }
    }
}
