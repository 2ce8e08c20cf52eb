//! 헬스 체크 endpoint.
//!
//! 로드밸런서/오케스트레이터용 liveness 확인과 Prometheus 메트릭 노출.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" | "degraded"
    pub status: String,
    /// API 버전
    pub version: String,
    /// 서버 업타임(초)
    pub uptime_secs: u64,
    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
    /// 디스커버리 문서 준비 여부
    pub jwks_ready: bool,
}

/// Liveness 체크.
///
/// JWKS 스냅샷이 없으면 `degraded`지만 200을 유지합니다.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let jwks_ready = state.jwks.snapshot().await.is_some();
    Json(HealthResponse {
        status: if jwks_ready { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        jwks_ready,
    })
}

/// Prometheus 텍스트 형식 메트릭.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
