//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → 환경 변수 순서로 덮어써서
//! 애플리케이션 설정을 구성합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PlatformError, PlatformResult};

/// 환경 변수 접두사 (`JUPYTER__AUTH__TOKEN_TTL_SECS` 형식).
pub const ENV_PREFIX: &str = "JUPYTER";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8382,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// `host:port` 형식의 바인딩 주소.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 토큰 발급/검증 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// 서명용 개인키 PEM 경로
    #[serde(default)]
    pub private_key_path: String,
    /// 검증/공개용 공개키 PEM 경로
    #[serde(default)]
    pub public_key_path: String,
    /// 토큰 발급자 (`iss`)
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// 토큰 대상 (`aud`)
    #[serde(default = "default_audience")]
    pub audience: String,
    /// 토큰 유효 기간 (초)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// 시간 클레임 검증 허용 오차 (초)
    #[serde(default)]
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            private_key_path: String::new(),
            public_key_path: String::new(),
            issuer: default_issuer(),
            audience: default_audience(),
            token_ttl_secs: default_token_ttl(),
            leeway_secs: 0,
        }
    }
}

fn default_issuer() -> String {
    "jupyter-platform".to_string()
}

fn default_audience() -> String {
    "jupyter-platform-api".to_string()
}

fn default_token_ttl() -> u64 {
    24 * 60 * 60
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 설정 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일은 없어도 됩니다. 기존 배포 호환을 위해
    /// `PRIVATE_KEY_PATH`, `PUBLIC_KEY_PATH`, `HTTP_ADDR`도 읽습니다.
    pub fn load<P: AsRef<Path>>(path: P) -> PlatformResult<Self> {
        let (legacy_host, legacy_port) = match std::env::var("HTTP_ADDR") {
            Ok(addr) => parse_http_addr(&addr)?,
            Err(_) => (None, None),
        };

        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8382)?
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.private_key_path", std::env::var("PRIVATE_KEY_PATH").ok())?
            .set_override_option("auth.public_key_path", std::env::var("PUBLIC_KEY_PATH").ok())?
            .set_override_option("server.host", legacy_host)?
            .set_override_option("server.port", legacy_port.map(i64::from))?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// 기본 경로(`config/default.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> PlatformResult<Self> {
        Self::load("config/default.toml")
    }

    /// 서버 시작 전에 필수 항목을 검증합니다.
    pub fn validate(&self) -> PlatformResult<()> {
        if self.auth.private_key_path.trim().is_empty() {
            return Err(PlatformError::Config(
                "auth.private_key_path (PRIVATE_KEY_PATH) is required".to_string(),
            ));
        }
        if self.auth.public_key_path.trim().is_empty() {
            return Err(PlatformError::Config(
                "auth.public_key_path (PUBLIC_KEY_PATH) is required".to_string(),
            ));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(PlatformError::Config(
                "auth.token_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.issuer.trim().is_empty() || self.auth.audience.trim().is_empty() {
            return Err(PlatformError::Config(
                "auth.issuer and auth.audience must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `HTTP_ADDR` 값(`host:port` 또는 `:port`)을 분해합니다.
pub fn parse_http_addr(addr: &str) -> PlatformResult<(Option<String>, Option<u16>)> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Ok((None, None));
    }

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| PlatformError::Config(format!("invalid HTTP_ADDR: {}", addr)))?;

    let port: u16 = port
        .parse()
        .map_err(|_| PlatformError::Config(format!("invalid port in HTTP_ADDR: {}", addr)))?;

    let host = if host.is_empty() {
        None
    } else {
        Some(host.trim_start_matches('[').trim_end_matches(']').to_string())
    };

    Ok((host, Some(port)))
}
