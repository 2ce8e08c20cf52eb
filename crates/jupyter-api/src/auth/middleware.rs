//! Axum용 인증 미들웨어.
//!
//! `Authorization: Bearer <token>`을 검증하고 [`Principal`]을
//! request extension으로 주입합니다. 실패 원인은 로그와 메트릭에만
//! 남기고 클라이언트에는 일반화된 401만 돌려줍니다.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{AuthError, Principal, TokenValidator};
use crate::metrics;

/// `Authorization` 헤더에서 Bearer 토큰을 꺼냅니다.
///
/// 스킴은 대소문자를 구분하지 않습니다.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MissingCredentials)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}

/// 인증 미들웨어.
///
/// # 사용 예시
///
/// ```rust,ignore
/// Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn_with_state(validator, authenticate));
/// ```
pub async fn authenticate(
    State(validator): State<Arc<TokenValidator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = match verify_request(&validator, request.headers()) {
        Ok(principal) => principal,
        Err(e) => {
            metrics::record_auth_request(false);
            metrics::record_auth_failure(e.reason());
            if e.is_token_error() {
                warn!(reason = e.reason(), error = %e, "Token rejected");
            } else {
                debug!(reason = e.reason(), "Missing bearer credentials");
            }
            return Err(e);
        }
    };

    metrics::record_auth_request(true);
    debug!(subject = %principal.subject, tenant = ?principal.tenant_id, "Request authenticated");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn verify_request(validator: &TokenValidator, headers: &HeaderMap) -> Result<Principal, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validator.parse(token)?;
    Ok(Principal::from(claims))
}
