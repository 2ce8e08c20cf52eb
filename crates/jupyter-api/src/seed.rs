//! 플랫폼 운영자 계정 시딩.
//!
//! `SEED_SUPERADMIN_EMAIL`, `SEED_SUPERADMIN_PASSWORD`가 모두 설정되어 있으면
//! 서버 시작 전에 테넌트가 없는 superadmin 계정을 만듭니다.

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::auth::{hash_password, AuthError, SUPERADMIN};
use crate::users::{DirectoryError, UserDirectory, UserRecord};

/// 시딩 에러.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// 환경 변수에서 읽은 시딩 대상.
#[derive(Debug)]
pub struct SuperadminSeed {
    pub email: String,
    pub password: SecretString,
}

impl SuperadminSeed {
    /// 두 변수가 모두 비어 있지 않을 때만 `Some`.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("SEED_SUPERADMIN_EMAIL").ok()?;
        let password = std::env::var("SEED_SUPERADMIN_PASSWORD").ok()?;
        if email.trim().is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            email: email.trim().to_string(),
            password: SecretString::from(password),
        })
    }
}

/// superadmin 계정을 만듭니다.
///
/// 같은 이메일이 이미 있으면 건드리지 않고 `Ok(false)`를 반환합니다.
pub async fn seed_superadmin(
    directory: &dyn UserDirectory,
    seed: &SuperadminSeed,
) -> Result<bool, SeedError> {
    if directory.find_by_email(&seed.email).await?.is_some() {
        info!(email = %seed.email, "Superadmin already exists, skipping seed");
        return Ok(false);
    }

    let password = seed.password.expose_secret().to_string();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::HashingFailure(format!("seed task: {}", e)))??;

    let user = UserRecord::new(seed.email.clone(), hash, None, SUPERADMIN);
    let user_id = user.id.clone();
    match directory.create(user).await {
        Ok(()) => {
            info!(user_id = %user_id, email = %seed.email, "Superadmin seeded");
            Ok(true)
        }
        // 동시에 다른 인스턴스가 만든 경우
        Err(DirectoryError::Conflict(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
