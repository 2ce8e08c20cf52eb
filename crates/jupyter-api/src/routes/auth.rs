//! 인증 endpoint.
//!
//! - `POST /api/v1/auth/login`: 이메일/비밀번호 확인 후 액세스 토큰 발급
//! - `POST /api/v1/auth/register`: 관리자 전용 사용자 생성
//! - `GET /api/v1/auth/me`: 토큰의 주체 정보

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::{
    authenticate, hash_password, require_any_role, validate_password_strength, verify_password,
    AuthError, ForbiddenReason, Principal, RoleGuard, ADMIN, SUPERADMIN, USER,
};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use crate::users::{DirectoryError, UserRecord};

/// 로그인 요청.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// 토큰 유효 기간 (초)
    pub expires_in: i64,
    pub user_id: String,
    /// 플랫폼 운영자는 빈 문자열
    pub company_id: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// 가입 요청.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub role: String,
}

/// 가입 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
    pub company_id: String,
    pub role: String,
}

/// 현재 주체 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
    pub company_id: Option<String>,
    pub email: String,
    pub roles: Vec<String>,
}

/// 인증 라우터 생성.
pub fn auth_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let authn = middleware::from_fn_with_state(state.validator.clone(), authenticate);

    Router::new()
        .route("/login", post(login))
        .route(
            "/register",
            post(register)
                .route_layer(middleware::from_fn_with_state(
                    RoleGuard::admins(),
                    require_any_role,
                ))
                .route_layer(authn.clone()),
        )
        .route("/me", get(me).route_layer(authn))
}

/// 비밀번호 검증을 blocking 스레드에서 실행합니다.
async fn verify_blocking(encoded: String, password: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&encoded, &password))
        .await
        .map_err(|e| AuthError::HashingFailure(format!("verification task: {}", e)))?
}

/// 로그인.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let user = state.users.find_by_email(email).await.map_err(|e| {
        error!(error = %e, "User lookup failed");
        metrics::record_login_attempt("error");
        ApiError::internal()
    })?;

    let Some(user) = user else {
        // 존재하지 않는 사용자도 같은 비용을 치름
        match verify_blocking(state.unknown_user_hash().to_string(), req.password).await {
            Ok(()) | Err(AuthError::InvalidCredentials) => {}
            Err(e) => {
                metrics::record_login_attempt("error");
                error!(reason = e.reason(), error = %e, "Unknown-user verification failed");
                return Err(e.into());
            }
        }
        metrics::record_login_attempt("invalid_credentials");
        info!(reason = "unknown_user", "Login rejected");
        return Err(AuthError::InvalidCredentials.into());
    };

    match verify_blocking(user.password_hash.clone(), req.password).await {
        Ok(()) => {}
        Err(AuthError::InvalidCredentials) => {
            metrics::record_login_attempt("invalid_credentials");
            info!(user_id = %user.id, reason = "wrong_password", "Login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => {
            metrics::record_login_attempt("error");
            error!(user_id = %user.id, reason = e.reason(), error = %e, "Password verification failed");
            return Err(e.into());
        }
    }

    let roles = vec![user.role.clone()];
    let token = state
        .signer
        .generate_token(&user.id, user.company_id.as_deref(), &user.email, &roles)
        .map_err(|e| {
            metrics::record_login_attempt("error");
            error!(user_id = %user.id, error = %e, "Token generation failed");
            ApiError::from(e)
        })?;

    metrics::record_login_attempt("success");
    info!(user_id = %user.id, tenant = ?user.company_id, "Login succeeded");

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.signer.settings().ttl_secs,
        user_id: user.id,
        company_id: user.company_id.unwrap_or_default(),
        email: user.email,
        roles,
    }))
}

/// 사용자 생성 (admin, superadmin 전용).
pub async fn register(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(req) = payload?;
    let email = req.email.trim().to_string();
    let company_id = req.company_id.trim().to_string();
    let role = req.role.trim().to_string();

    if email.is_empty() || req.password.is_empty() || company_id.is_empty() || role.is_empty() {
        return Err(ApiError::bad_request(
            "email, password, company_id and role are required",
        ));
    }
    if role != ADMIN && role != USER {
        return Err(ApiError::bad_request("role must be 'admin' or 'user'"));
    }
    validate_password_strength(&req.password).map_err(ApiError::bad_request)?;

    // 테넌트 관리자는 자기 회사에만 사용자를 만들 수 있음
    if !principal.has_role(SUPERADMIN) && principal.tenant_id.as_deref() != Some(company_id.as_str()) {
        warn!(
            subject = %principal.subject,
            target_company = %company_id,
            "Cross-tenant registration denied"
        );
        return Err(AuthError::Forbidden(ForbiddenReason::InsufficientRole).into());
    }

    let existing = state.users.find_by_email(&email).await.map_err(|e| {
        error!(error = %e, "User lookup failed");
        ApiError::internal()
    })?;
    if existing.is_some() {
        return Err(ApiError::conflict("email already exists"));
    }

    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Hashing task failed");
            ApiError::internal()
        })?
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::from(e)
        })?;

    let user = UserRecord::new(email, hash, Some(company_id), role);
    let response = RegisterResponse {
        user_id: user.id.clone(),
        email: user.email.clone(),
        company_id: user.company_id.clone().unwrap_or_default(),
        role: user.role.clone(),
    };

    match state.users.create(user).await {
        Ok(()) => {}
        Err(DirectoryError::Conflict(_)) => return Err(ApiError::conflict("email already exists")),
        Err(e) => {
            error!(error = %e, "User creation failed");
            return Err(ApiError::internal());
        }
    }

    info!(
        user_id = %response.user_id,
        created_by = %principal.subject,
        company_id = %response.company_id,
        role = %response.role,
        "User registered"
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// 현재 토큰의 주체 정보.
pub async fn me(principal: Principal) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: principal.subject,
        company_id: principal.tenant_id,
        email: principal.email,
        roles: principal.roles,
    })
}
