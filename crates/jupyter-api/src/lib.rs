//! Jupyter 플랫폼 인증 API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - RS256 JWT 발급/검증
//! - 공개키 디스커버리 (JWKS) 캐시와 조건부 응답
//! - Bearer 토큰 인증 미들웨어와 역할 가드
//! - 로그인/가입/현재 주체 endpoint
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`auth`]: 해싱, 키, 토큰, JWKS, 미들웨어, RBAC
//! - [`users`]: 사용자 디렉터리 인터페이스
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: HTTP 엔드포인트
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`seed`]: superadmin 시딩

pub mod auth;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod seed;
pub mod state;
pub mod users;

pub use auth::{
    authenticate, hash_password, require_any_role, verify_password, AuthError, Claims,
    JwksCache, Principal, RoleGuard, TokenSigner, TokenValidator,
};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use routes::create_router;
pub use state::AppState;
pub use users::{InMemoryUserDirectory, UserDirectory, UserRecord};
