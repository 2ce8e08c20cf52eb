//! 아이덴티티 토큰 페이로드.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JWT 페이로드.
///
/// 발급 후 변경되지 않으며 서버 측 세션 없이 서명과 시간 클레임만으로
/// 유효성이 결정됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// 테넌트(회사) ID. 플랫폼 운영자는 빈 문자열
    #[serde(default)]
    pub company_id: String,
    /// 사용자 이메일
    #[serde(default)]
    pub email: String,
    /// 역할 목록 (순서 유지, 중복 허용)
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub roles: Vec<String>,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Not Before (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// JWT ID - 발급마다 새로 생성되는 무작위 식별자
    pub jti: String,
}

impl Claims {
    /// 테넌트 ID. 비어 있으면 `None`.
    pub fn tenant_id(&self) -> Option<&str> {
        if self.company_id.is_empty() {
            None
        } else {
            Some(&self.company_id)
        }
    }
}

/// `roles`를 문자열 목록으로 읽습니다.
///
/// 문자열이 아닌 원소는 버리고, 배열이 아니면 빈 목록이 됩니다.
fn deserialize_roles<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(role) => Some(role),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
