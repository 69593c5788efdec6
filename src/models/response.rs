use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub model_ready: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FeeRecommendation {
    pub base_fee_gwei: f64,
    pub max_priority_fee_per_gas_gwei: f64,
    pub max_fee_per_gas_gwei: f64,
    pub features: FeatureSnapshot,
    pub model_ready: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FeatureSnapshot {
    pub prev_base_fee_gwei: f64,
    pub gas_used_ratio: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NetworkMeta {
    pub chain_id: u64,
    pub block_number: u64,
}
