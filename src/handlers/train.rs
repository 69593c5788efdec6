use crate::{
    error::FeeOracleError,
    handlers::AppState,
    models::{ApiResponse, TrainReport},
};
use axum::{extract::State, Json};

pub async fn trigger_train(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TrainReport>>, FeeOracleError> {
    let report = state.training.train().await?;
    Ok(Json(ApiResponse::ok(report)))
}
