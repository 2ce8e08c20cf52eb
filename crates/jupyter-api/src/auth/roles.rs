//! 역할 기반 접근 제어 (RBAC).
//!
//! 허용 역할 집합을 가진 [`RoleGuard`]를 라우트에 미들웨어로 붙입니다.
//! 역할 비교는 정확한 문자열 일치(대소문자 구분)이며 순서와 무관합니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{AuthError, ForbiddenReason, Principal};
use crate::metrics;

/// 플랫폼 운영자
pub const SUPERADMIN: &str = "superadmin";
/// 테넌트 관리자
pub const ADMIN: &str = "admin";
/// 일반 사용자
pub const USER: &str = "user";

/// 역할 가드.
///
/// 생성 후 허용 집합은 바뀌지 않으며 복제 비용은 `Arc` 하나입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    allowed: Arc<BTreeSet<String>>,
}

impl RoleGuard {
    /// 허용 역할 중 하나라도 가진 주체만 통과시키는 가드.
    pub fn any_of<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            allowed: Arc::new(roles.into_iter().map(Into::into).collect()),
        }
    }

    /// `{"superadmin"}` 전용 가드.
    pub fn superadmin() -> Self {
        Self::any_of([SUPERADMIN])
    }

    /// `{"admin", "superadmin"}` 가드.
    pub fn admins() -> Self {
        Self::any_of([ADMIN, SUPERADMIN])
    }

    /// 허용 역할 집합.
    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// 주체의 역할을 검사합니다.
    ///
    /// - 역할 없음 → `Forbidden(NoRoles)`
    /// - 교집합 없음 → `Forbidden(InsufficientRole)`
    pub fn check(&self, principal: &Principal) -> Result<(), AuthError> {
        if principal.roles.is_empty() {
            return Err(AuthError::Forbidden(ForbiddenReason::NoRoles));
        }
        if principal.roles.iter().any(|role| self.allowed.contains(role)) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(ForbiddenReason::InsufficientRole))
        }
    }
}

/// 역할 가드 미들웨어.
///
/// 인증 미들웨어 뒤(안쪽)에 위치해야 합니다. Principal이 없으면 401.
///
/// # 사용 예시
///
/// ```rust,ignore
/// Router::new()
///     .route("/register", post(register))
///     .layer(middleware::from_fn_with_state(RoleGuard::admins(), require_any_role))
///     .layer(middleware::from_fn_with_state(validator, authenticate));
/// ```
pub async fn require_any_role(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or(AuthError::MissingCredentials)?;

    if let Err(e) = guard.check(principal) {
        metrics::record_role_denial(e.reason());
        warn!(
            subject = %principal.subject,
            reason = e.reason(),
            "Role guard denied request"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
