//! 요청 단위 인증 주체.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, Claims};

/// 검증된 토큰에서 추출한 주체 (사용자 + 테넌트 + 역할).
///
/// 인증 미들웨어가 요청마다 새로 만들어 request extension에 넣으며,
/// 해당 요청이 끝나면 버려집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// 사용자 ID (`sub`)
    pub subject: String,
    /// 회사 ID. 플랫폼 운영자는 `None`
    pub tenant_id: Option<String>,
    /// 이메일
    pub email: String,
    /// 역할 목록
    pub roles: Vec<String>,
}

impl Principal {
    /// 역할 보유 여부 (대소문자 구분).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        let tenant_id = claims.tenant_id().map(str::to_string);
        Self {
            subject: claims.sub,
            tenant_id,
            email: claims.email,
            roles: claims.roles,
        }
    }
}

/// 핸들러에서 `principal: Principal`로 꺼내 씁니다.
///
/// 인증 미들웨어를 거치지 않은 요청이면 401.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
