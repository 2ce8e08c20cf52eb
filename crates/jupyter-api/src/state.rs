//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! `Arc<AppState>`로 래핑되어 라우터에 주입됩니다. 키 로드 이후
//! 변경 가능한 공유 상태는 [`JwksCache`] 하나뿐입니다.

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use jupyter_core::config::AuthConfig;

use crate::auth::{
    hash_password, AuthError, JwksCache, KeyPair, TokenSettings, TokenSigner, TokenValidator,
};
use crate::users::UserDirectory;

/// 애플리케이션 공유 상태.
pub struct AppState {
    /// 토큰 발급자
    pub signer: Arc<TokenSigner>,
    /// 토큰 검증기 (인증 미들웨어의 상태)
    pub validator: Arc<TokenValidator>,
    /// 공개키 디스커버리 캐시
    pub jwks: Arc<JwksCache>,
    /// 사용자 디렉터리
    pub users: Arc<dyn UserDirectory>,
    /// Prometheus 렌더링 핸들 (미설치 시 None)
    pub metrics: Option<PrometheusHandle>,
    /// 서버 시작 시각
    pub started_at: Instant,
    /// 알 수 없는 이메일의 로그인 검증에 쓰는 해시 (운영 파라미터)
    unknown_user_hash: String,
}

impl AppState {
    /// 설정된 키 파일로 상태를 구성합니다.
    ///
    /// 키를 읽을 수 없거나 두 키가 맞지 않으면 실패하며,
    /// 이 경우 서버를 시작해서는 안 됩니다.
    pub async fn from_config(
        config: &AuthConfig,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self, AuthError> {
        let keys = KeyPair::load(&config.private_key_path, &config.public_key_path)?;
        Self::from_keys(&keys, TokenSettings::from(config), &config.public_key_path, users).await
    }

    /// 이미 읽은 키로 상태를 구성합니다.
    ///
    /// 서명자와 디스커버리 문서가 같은 공개키에서 `kid`를 얻으므로
    /// 둘은 항상 일치합니다.
    pub async fn from_keys(
        keys: &KeyPair,
        settings: TokenSettings,
        public_key_path: &str,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self, AuthError> {
        let signer = TokenSigner::new(keys, settings.clone())?;
        let validator = TokenValidator::new(&keys.public, &settings)?;

        let jwks = JwksCache::new(public_key_path);
        jwks.rebuild_from(&keys.public).await?;

        let unknown_user_hash =
            tokio::task::spawn_blocking(|| hash_password("jupyter-unknown-user"))
                .await
                .map_err(|e| AuthError::HashingFailure(format!("unknown-user hash task: {}", e)))??;

        info!(kid = %signer.kid(), issuer = %settings.issuer, "Authentication state ready");

        Ok(Self {
            signer: Arc::new(signer),
            validator: Arc::new(validator),
            jwks: Arc::new(jwks),
            users,
            metrics: None,
            started_at: Instant::now(),
            unknown_user_hash,
        })
    }

    /// 알 수 없는 이메일로 로그인할 때 검증할 해시.
    ///
    /// 등록된 사용자와 같은 비용의 Argon2 검증을 거치게 합니다.
    pub fn unknown_user_hash(&self) -> &str {
        &self.unknown_user_hash
    }

    /// Prometheus 핸들을 연결합니다.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("signer", &self.signer)
            .field("jwks", &self.jwks)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
