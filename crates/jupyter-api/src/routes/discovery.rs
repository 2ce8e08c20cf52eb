//! 공개키 디스커버리 endpoint (`/.well-known/jwks.json`).
//!
//! 인증 없이 공개되며 GET/HEAD 외 메서드는 405를 돌려줍니다.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Method},
    response::Response,
    routing::any,
    Router,
};

use crate::auth::jwks::serve_discovery;
use crate::state::AppState;

/// JWKS 경로.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// 디스커버리 라우터 생성.
pub fn discovery_router() -> Router<Arc<AppState>> {
    Router::new().route(JWKS_PATH, any(jwks))
}

/// JWKS 문서 제공.
pub async fn jwks(State(state): State<Arc<AppState>>, method: Method, headers: HeaderMap) -> Response {
    serve_discovery(&state.jwks, &method, &headers).await
}
