use crate::{handlers::AppState, models::HealthStatus};
use axum::{extract::State, Json};
use chrono::Utc;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_ready: state.store.get().await.is_some(),
        timestamp: Utc::now(),
    })
}
