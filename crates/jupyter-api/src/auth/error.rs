//! 인증/인가 에러.
//!
//! 클라이언트에는 일반화된 `unauthorized`만 노출하고,
//! 실제 원인은 [`AuthError::reason`]으로 로그에만 남깁니다.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// 권한 거부 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Principal에 역할이 하나도 없음
    NoRoles,
    /// 허용된 역할과 교집합이 없음
    InsufficientRole,
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForbiddenReason::NoRoles => write!(f, "no roles"),
            ForbiddenReason::InsufficientRole => write!(f, "insufficient role"),
        }
    }
}

/// 인증 서브시스템 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization 헤더가 없거나 `Bearer <token>` 형식이 아님
    #[error("missing bearer token")]
    MissingCredentials,
    /// 비밀번호 불일치 또는 알 수 없는 사용자 (구분하지 않음)
    #[error("invalid credentials")]
    InvalidCredentials,
    /// 저장된 해시 문자열을 해석할 수 없음 (데이터 무결성 문제)
    #[error("malformed password hash: {0}")]
    MalformedHash(String),
    /// 해시 생성 실패 (난수 소스 고갈 등)
    #[error("password hashing failed: {0}")]
    HashingFailure(String),
    /// 키 파일을 읽거나 해석할 수 없음
    #[error("key load failure: {0}")]
    KeyLoadFailure(String),
    /// 토큰 서명 실패
    #[error("token signing failed: {0}")]
    SigningFailure(String),
    /// 토큰 구조가 올바르지 않음
    #[error("malformed token: {0}")]
    TokenMalformed(String),
    /// 고정 알고리즘(RS256)이 아닌 토큰
    #[error("unexpected token algorithm: {0}")]
    AlgorithmMismatch(String),
    /// 만료된 토큰
    #[error("token expired")]
    TokenExpired,
    /// 아직 유효하지 않은 토큰 (nbf/iat가 미래)
    #[error("token not yet valid")]
    TokenNotYetValid,
    /// 서명 검증 실패
    #[error("token signature invalid")]
    SignatureInvalid,
    /// 발급자/대상 클레임 불일치
    #[error("token claim mismatch: {0}")]
    ClaimMismatch(String),
    /// 인증은 되었으나 역할이 부족함
    #[error("forbidden ({0})")]
    Forbidden(ForbiddenReason),
    /// 디스커버리 문서 생성 실패
    #[error("key publication failed: {0}")]
    PublishFailure(String),
    /// 디스커버리 문서가 아직 준비되지 않음
    #[error("JWKS not available")]
    PublishUnavailable,
    /// 허용되지 않은 HTTP 메서드
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl AuthError {
    /// HTTP 상태 코드.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidCredentials
            | AuthError::TokenMalformed(_)
            | AuthError::AlgorithmMismatch(_)
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid
            | AuthError::SignatureInvalid
            | AuthError::ClaimMismatch(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AuthError::MalformedHash(_)
            | AuthError::HashingFailure(_)
            | AuthError::KeyLoadFailure(_)
            | AuthError::SigningFailure(_)
            | AuthError::PublishFailure(_)
            | AuthError::PublishUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 토큰 검증 단계의 실패인지 확인합니다.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            AuthError::TokenMalformed(_)
                | AuthError::AlgorithmMismatch(_)
                | AuthError::TokenExpired
                | AuthError::TokenNotYetValid
                | AuthError::SignatureInvalid
                | AuthError::ClaimMismatch(_)
        )
    }

    /// 로그/메트릭용 원인 코드.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MalformedHash(_) => "malformed_hash",
            AuthError::HashingFailure(_) => "hashing_failure",
            AuthError::KeyLoadFailure(_) => "key_load_failure",
            AuthError::SigningFailure(_) => "signing_failure",
            AuthError::TokenMalformed(_) => "token_malformed",
            AuthError::AlgorithmMismatch(_) => "algorithm_mismatch",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimMismatch(_) => "claim_mismatch",
            AuthError::Forbidden(ForbiddenReason::NoRoles) => "no_roles",
            AuthError::Forbidden(ForbiddenReason::InsufficientRole) => "insufficient_role",
            AuthError::PublishFailure(_) => "publish_failure",
            AuthError::PublishUnavailable => "publish_unavailable",
            AuthError::MethodNotAllowed => "method_not_allowed",
        }
    }

    /// 클라이언트에 노출되는 (코드, 메시지).
    fn public_view(&self) -> (&'static str, String) {
        match self {
            AuthError::MissingCredentials => ("UNAUTHORIZED", self.to_string()),
            AuthError::InvalidCredentials => ("UNAUTHORIZED", self.to_string()),
            e if e.is_token_error() => ("UNAUTHORIZED", "invalid token".to_string()),
            AuthError::Forbidden(_) => ("FORBIDDEN", self.to_string()),
            AuthError::MethodNotAllowed => ("METHOD_NOT_ALLOWED", "Method not allowed".to_string()),
            AuthError::PublishUnavailable => ("JWKS_UNAVAILABLE", self.to_string()),
            _ => ("INTERNAL_ERROR", "internal error".to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = self.public_view();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        let mut response = (status, body).into_response();
        match status {
            StatusCode::UNAUTHORIZED => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            StatusCode::METHOD_NOT_ALLOWED => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
            }
            _ => {}
        }
        response
    }
}
