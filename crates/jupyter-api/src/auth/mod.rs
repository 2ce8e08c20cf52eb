//! 인증 및 권한 부여.
//!
//! RS256 JWT 기반 인증, 공개키 디스커버리(JWKS), 역할 기반 접근 제어를
//! 제공합니다.
//!
//! # 구성 요소
//!
//! - [`password`]: Argon2id 비밀번호 해싱/검증
//! - [`keys`]: PEM 키 로딩과 `kid` 계산
//! - [`TokenSigner`] / [`TokenValidator`]: 토큰 발급/검증
//! - [`JwksCache`]: 디스커버리 문서 스냅샷 캐시
//! - [`authenticate`]: Bearer 토큰 검증 후 [`Principal`] 주입
//! - [`RoleGuard`]: 역할 집합 기반 접근 제어
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! // 보호된 라우트에서 Principal 추출기 사용
//! async fn protected_handler(principal: Principal) -> impl IntoResponse {
//!     format!("Hello, {}!", principal.email)
//! }
//! ```

mod claims;
mod error;
pub mod jwks;
mod jwt;
pub mod keys;
mod middleware;
pub mod password;
mod principal;
mod roles;

#[cfg(test)]
pub(crate) mod testutil;

pub use claims::Claims;
pub use error::{AuthError, ForbiddenReason};
pub use jwks::{fingerprint, Jwk, JwksCache, JwksDocument, JwksSnapshot, JWKS_CACHE_CONTROL};
pub use jwt::{TokenSettings, TokenSigner, TokenValidator};
pub use keys::{KeyPair, PrivateKeyMaterial, PublicKeyMaterial};
pub use middleware::{authenticate, bearer_token};
pub use password::{hash_password, validate_password_strength, verify_password, HashParams};
pub use principal::Principal;
pub use roles::{require_any_role, RoleGuard, ADMIN, SUPERADMIN, USER};
