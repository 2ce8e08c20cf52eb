//! 사용자 디렉터리.
//!
//! 로그인/가입 흐름이 소비하는 사용자 조회·생성 인터페이스와
//! 메모리 기반 구현입니다. 영속 저장소는 이 트레이트를 구현해 주입합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 사용자 레코드.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// 사용자 ID (UUID 문자열)
    pub id: String,
    pub email: String,
    /// 인코딩된 Argon2id 해시
    pub password_hash: String,
    /// 소속 회사 ID. 플랫폼 운영자는 `None`
    pub company_id: Option<String>,
    /// 역할 (superadmin, admin, user)
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// 새 레코드를 만듭니다. ID는 UUID v4.
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        company_id: Option<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            password_hash: password_hash.into(),
            company_id,
            role: role.into(),
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("company_id", &self.company_id)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// 디렉터리 에러.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// 같은 이메일이 이미 존재
    #[error("user already exists: {0}")]
    Conflict(String),
    /// 저장소 장애
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// 사용자 조회/생성 인터페이스.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 이메일로 사용자를 찾습니다 (대소문자 무시).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// 사용자를 생성합니다. 이메일 중복이면 [`DirectoryError::Conflict`].
    async fn create(&self, user: UserRecord) -> Result<(), DirectoryError>;
}

/// 메모리 기반 사용자 디렉터리.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    /// 소문자 이메일 → 레코드
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 등록된 사용자 수.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.read().await.get(&normalize_email(email)).cloned())
    }

    async fn create(&self, user: UserRecord) -> Result<(), DirectoryError> {
        let key = normalize_email(&user.email);
        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(DirectoryError::Conflict(user.email));
        }
        users.insert(key, user);
        Ok(())
    }
}
