//! API 에러 응답 타입.
//!
//! 인증 외 핸들러(입력 검증, 중복, 내부 오류)에서 쓰는 공통 에러 형식입니다.
//! 인증/인가 실패는 [`crate::auth::AuthError`]가 직접 응답으로 변환됩니다.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// API 에러 응답 본문.
///
/// ```json
/// { "error": { "code": "INVALID_INPUT", "message": "email and password are required" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// 에러 코드와 메시지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// 에러 코드 (예: "INVALID_INPUT", "CONFLICT")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
}

impl ApiErrorResponse {
    /// 에러 생성.
    ///
    /// # Arguments
    ///
    /// * `code` - 에러 코드
    /// * `message` - 에러 메시지
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.error.code
    }

    /// 에러 메시지 반환.
    pub fn message(&self) -> &str {
        &self.error.message
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error.code, self.error.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 핸들러 에러.
#[derive(Debug)]
pub enum ApiError {
    /// 인증/인가 에러 (응답 형식은 AuthError가 결정)
    Auth(AuthError),
    /// 상태 코드와 본문
    Response(StatusCode, ApiErrorResponse),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Response(
            StatusCode::BAD_REQUEST,
            ApiErrorResponse::new("INVALID_INPUT", message),
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Response(StatusCode::CONFLICT, ApiErrorResponse::new("CONFLICT", message))
    }

    /// 내부 오류. 상세 내용은 로그에만 남기고 본문은 일반화합니다.
    pub fn internal() -> Self {
        Self::Response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorResponse::new("INTERNAL_ERROR", "internal error"),
        )
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

/// 본문 파싱 실패도 같은 JSON 형식으로 응답합니다.
///
/// 상태 코드는 거부 사유를 따릅니다 (문법 오류 400, Content-Type 누락 415 등).
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Response(
            rejection.status(),
            ApiErrorResponse::new("INVALID_INPUT", rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => err.into_response(),
            ApiError::Response(status, body) => (status, Json(body)).into_response(),
        }
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;
