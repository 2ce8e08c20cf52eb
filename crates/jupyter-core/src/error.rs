//! 플랫폼 공통 에러 타입.
//!
//! 시작 단계(설정, 파일 I/O)에서 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 플랫폼 공통 에러.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 파일 입출력 에러
    #[error("입출력 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 플랫폼 작업을 위한 Result 타입.
pub type PlatformResult<T> = Result<T, PlatformError>;

impl PlatformError {
    /// 프로세스 시작을 중단해야 하는 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlatformError::Config(_) | PlatformError::Io(_))
    }
}

impl From<config::ConfigError> for PlatformError {
    fn from(err: config::ConfigError) -> Self {
        PlatformError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::Serialization(err.to_string())
    }
}
