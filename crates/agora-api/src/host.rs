use axum::{Json, extract::State};
use tracing::warn;

use agora_types::api::{InfoResponse, MessageResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

pub async fn health() -> &'static str {
    "OK"
}

pub async fn about() -> Json<MessageResponse> {
    Json(MessageResponse::new("This is a social media API server."))
}

/// GET /info — reports which backend instance answered.
pub async fn info(State(state): State<AppState>) -> ApiResult<Json<InfoResponse>> {
    let ip = state.metadata.private_ipv4().await.map_err(|e| {
        warn!("Metadata lookup failed: {}", e);
        ApiError::Upstream("can't get private IPv4".into())
    })?;

    Ok(Json(InfoResponse {
        message: format!("Hello from backend - private IP {ip}"),
        private_ip: ip,
    }))
}
