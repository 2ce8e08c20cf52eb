//! HTTP 라우트.
//!
//! # 경로
//!
//! - `/.well-known/jwks.json`: 공개키 디스커버리 (공개)
//! - `/api/v1/auth/login`: 로그인 (공개)
//! - `/api/v1/auth/register`: 사용자 생성 (admin, superadmin)
//! - `/api/v1/auth/me`: 현재 주체 (인증 필요)
//! - `/health`, `/metrics`

pub mod auth;
pub mod discovery;
pub mod health;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::AppState;

pub use auth::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse};
pub use discovery::JWKS_PATH;
pub use health::HealthResponse;

/// 전체 라우터 생성.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(discovery::discovery_router())
        .nest("/api/v1/auth", auth::auth_router(&state))
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .with_state(state)
}
