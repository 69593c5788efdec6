use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

pub async fn export_metrics() -> impl IntoResponse {
    match crate::metrics::encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("metrics encode failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
