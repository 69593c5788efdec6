use crate::{
    error::FeeOracleError,
    handlers::AppState,
    models::{ApiResponse, NetworkMeta},
};
use axum::{extract::State, Json};

pub async fn get_network(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<NetworkMeta>>, FeeOracleError> {
    let meta = state.ethereum.network_meta().await?;
    Ok(Json(ApiResponse::ok(meta)))
}
