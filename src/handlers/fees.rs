use crate::{
    error::FeeOracleError,
    metrics,
    models::{ApiResponse, FeatureSnapshot, FeeRecommendation},
    services::{predict, BlockSource, EthereumSource, ModelStore, TrainingService},
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub ethereum: Arc<EthereumSource>,
    pub store: Arc<ModelStore>,
    pub training: Arc<TrainingService>,
    pub default_priority_gwei: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(rename = "priorityGwei")]
    pub priority_gwei: Option<f64>,
}

pub async fn recommend_fee(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<ApiResponse<FeeRecommendation>>, FeeOracleError> {
    let latest = state
        .ethereum
        .latest_block()
        .await?
        .ok_or(FeeOracleError::FeeDataUnavailable)?;
    let prev_base_fee_gwei = latest
        .base_fee_gwei()
        .ok_or(FeeOracleError::FeeDataUnavailable)?;
    let gas_used_ratio = latest.gas_used_ratio();

    let model = state.store.get().await;

    let started = Instant::now();
    let predicted = model
        .as_deref()
        .and_then(|m| predict(m, &[prev_base_fee_gwei, gas_used_ratio]))
        .unwrap_or(prev_base_fee_gwei);
    metrics::INFERENCE_DURATION.observe(started.elapsed().as_secs_f64() * 1_000.0);

    let priority = query
        .priority_gwei
        .filter(|p| p.is_finite() && *p > 0.0 && *p <= 1000.0)
        .unwrap_or(state.default_priority_gwei);
    let max_priority_fee = priority.max(0.1);
    let max_fee = predicted * 1.125 + max_priority_fee;

    Ok(Json(ApiResponse::ok(FeeRecommendation {
        base_fee_gwei: round_to(predicted, 3),
        max_priority_fee_per_gas_gwei: round_to(max_priority_fee, 3),
        max_fee_per_gas_gwei: round_to(max_fee, 3),
        features: FeatureSnapshot {
            prev_base_fee_gwei,
            gas_used_ratio: round_to(gas_used_ratio, 4),
        },
        model_ready: model.is_some(),
    })))
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn rounds_to_requested_places() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(2.0, 3), 2.0);
    }
}
