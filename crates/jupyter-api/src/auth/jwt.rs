//! JWT 토큰 발급/검증.
//!
//! RS256 고정. 서명자는 개인키로 토큰을 만들고 헤더에 `kid`를 기록하며,
//! 검증기는 공개키로 서명·알고리즘·시간 클레임을 확인합니다.

use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde_json::Value;

use jupyter_core::config::AuthConfig;

use super::keys::{KeyPair, PublicKeyMaterial, SIGNING_ALGORITHM, SIGNING_ALGORITHM_NAME};
use super::{AuthError, Claims};

/// 토큰 발급/검증 파라미터.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    /// `iss`
    pub issuer: String,
    /// `aud`
    pub audience: String,
    /// 유효 기간 (초)
    pub ttl_secs: i64,
    /// 시간 클레임 허용 오차 (초)
    pub leeway_secs: u64,
}

impl From<&AuthConfig> for TokenSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl_secs: i64::try_from(config.token_ttl_secs).unwrap_or(i64::MAX),
            leeway_secs: config.leeway_secs,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

/// 128비트 무작위 토큰 ID.
fn new_token_id() -> Result<String, AuthError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::SigningFailure(format!("token id generation: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// 토큰 서명자.
///
/// 키 로드 이후에는 상태가 없으므로 `Arc`로 공유해 동시에 호출해도 됩니다.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    kid: String,
    settings: TokenSettings,
}

impl TokenSigner {
    /// 키 쌍으로 서명자를 만듭니다. `kid`는 공개키에서 한 번만 계산됩니다.
    pub fn new(keys: &KeyPair, settings: TokenSettings) -> Result<Self, AuthError> {
        Ok(Self {
            encoding_key: keys.private.encoding_key()?,
            kid: keys.kid().to_string(),
            settings,
        })
    }

    /// 두 PEM 파일에서 서명자를 만듭니다.
    pub fn from_files(
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
        settings: TokenSettings,
    ) -> Result<Self, AuthError> {
        Self::new(&KeyPair::load(private_path, public_path)?, settings)
    }

    /// 헤더에 기록되는 키 식별자.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// 발급 파라미터.
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// 현재 시각 기준으로 클레임을 구성합니다.
    ///
    /// # Arguments
    ///
    /// * `subject` - 사용자 ID
    /// * `tenant` - 회사 ID (플랫폼 운영자는 `None`)
    /// * `email` - 사용자 이메일
    /// * `roles` - 역할 목록
    pub fn build_claims(
        &self,
        subject: &str,
        tenant: Option<&str>,
        email: &str,
        roles: &[String],
    ) -> Result<Claims, AuthError> {
        let now = Utc::now().timestamp();
        Ok(Claims {
            sub: subject.to_string(),
            company_id: tenant.unwrap_or_default().to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now,
            exp: now.saturating_add(self.settings.ttl_secs),
            nbf: None,
            jti: new_token_id()?,
        })
    }

    /// 주어진 클레임에 서명합니다.
    pub fn sign_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::SigningFailure(e.to_string()))
    }

    /// 액세스 토큰 발급.
    pub fn generate_token(
        &self,
        subject: &str,
        tenant: Option<&str>,
        email: &str,
        roles: &[String],
    ) -> Result<String, AuthError> {
        let claims = self.build_claims(subject, tenant, email, roles)?;
        self.sign_claims(&claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("kid", &self.kid)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// 토큰 검증기.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    kid: String,
    leeway_secs: i64,
}

impl TokenValidator {
    /// 공개키로 검증기를 만듭니다.
    pub fn new(public: &PublicKeyMaterial, settings: &TokenSettings) -> Result<Self, AuthError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);
        validation.leeway = settings.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Ok(Self {
            decoding_key: public.decoding_key()?,
            validation,
            kid: public.kid().to_string(),
            leeway_secs: i64::try_from(settings.leeway_secs).unwrap_or(i64::MAX),
        })
    }

    /// 공개키 PEM 파일에서 검증기를 만듭니다.
    pub fn from_file(path: impl AsRef<Path>, settings: &TokenSettings) -> Result<Self, AuthError> {
        Self::new(&PublicKeyMaterial::from_file(path)?, settings)
    }

    /// 검증에 사용하는 키 식별자.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// 토큰을 검증하고 클레임을 반환합니다.
    ///
    /// 알고리즘 확인은 다른 어떤 처리보다 먼저 수행합니다.
    pub fn parse(&self, token: &str) -> Result<Claims, AuthError> {
        let (header, signature) = decode_raw_header(token)?;

        match header.get("alg") {
            Some(Value::String(alg)) if alg == SIGNING_ALGORITHM_NAME => {}
            Some(Value::String(alg)) => return Err(AuthError::AlgorithmMismatch(alg.clone())),
            Some(_) | None => {
                return Err(AuthError::AlgorithmMismatch("missing alg".to_string()))
            }
        }

        match header.get("kid") {
            Some(Value::String(kid)) if kid != &self.kid => {
                return Err(AuthError::SignatureInvalid);
            }
            Some(Value::String(_)) | None => {}
            Some(_) => return Err(AuthError::TokenMalformed("kid is not a string".to_string())),
        }

        // 서명 세그먼트가 base64url로 해석되지 않으면 서명 불일치
        if URL_SAFE_NO_PAD.decode(signature).is_err() {
            return Err(AuthError::SignatureInvalid);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;
        let claims = data.claims;

        if claims.iat > Utc::now().timestamp().saturating_add(self.leeway_secs) {
            return Err(AuthError::TokenNotYetValid);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("kid", &self.kid)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

/// 서명 검증 전에 JOSE 헤더만 해석하고, 서명 세그먼트를 함께 돌려줍니다.
fn decode_raw_header(token: &str) -> Result<(serde_json::Map<String, Value>, &str), AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::TokenMalformed("expected three segments".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::TokenMalformed(format!("header encoding: {}", e)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok((map, signature)),
        Ok(_) => Err(AuthError::TokenMalformed("header is not an object".to_string())),
        Err(e) => Err(AuthError::TokenMalformed(format!("header json: {}", e))),
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch("rejected by validator".to_string()),
        ErrorKind::InvalidIssuer => AuthError::ClaimMismatch("iss".to_string()),
        ErrorKind::InvalidAudience => AuthError::ClaimMismatch("aud".to_string()),
        ErrorKind::InvalidSubject => AuthError::ClaimMismatch("sub".to_string()),
        _ => AuthError::TokenMalformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testutil::{
        forge_token, test_key_pair, test_settings, test_signer, test_validator,
        ROTATED_PRIVATE_PEM, ROTATED_PUBLIC_PEM,
    };
    use crate::auth::keys::PrivateKeyMaterial;

    fn roles(list: &[&str]) -> Vec<String> {
        list.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_round_trip() {
        let signer = test_signer();
        let validator = test_validator();

        let claims = signer
            .build_claims("u1", Some("c1"), "a@b.com", &roles(&["admin", "user", "admin"]))
            .unwrap();
        let token = signer.sign_claims(&claims).unwrap();

        let parsed = validator.parse(&token).unwrap();
        assert_eq!(parsed, claims);
        assert_eq!(parsed.tenant_id(), Some("c1"));
        assert_eq!(parsed.exp - parsed.iat, 86400);
    }

    #[test]
    fn test_header_carries_kid() {
        let signer = test_signer();
        let token = signer
            .generate_token("u1", None, "ops@platform.io", &roles(&["superadmin"]))
            .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, SIGNING_ALGORITHM);
        assert_eq!(header.kid.as_deref(), Some(signer.kid()));
        assert_eq!(signer.kid(), test_key_pair().kid());
    }

    #[test]
    fn test_token_ids_are_unique() {
        let signer = test_signer();
        let a = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        let b = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        assert_ne!(a.jti, b.jti);
        assert_eq!(a.company_id, "");
    }

    #[test]
    fn test_flipped_signature_byte_rejected() {
        let signer = test_signer();
        let validator = test_validator();
        let token = signer
            .generate_token("u1", Some("c1"), "a@b.com", &roles(&["admin"]))
            .unwrap();

        let (signed, signature) = token.rsplit_once('.').unwrap();
        let original = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for index in [0, original.len() / 2, original.len() - 1] {
            let mut tampered = original.clone();
            tampered[index] ^= 0x01;
            let forged = format!("{}.{}", signed, URL_SAFE_NO_PAD.encode(&tampered));
            assert!(matches!(
                validator.parse(&forged),
                Err(AuthError::SignatureInvalid)
            ));
        }
    }

    #[test]
    fn test_flipped_encoded_signature_char_rejected() {
        let signer = test_signer();
        let validator = test_validator();
        let token = signer
            .generate_token("u1", Some("c1"), "a@b.com", &roles(&["admin"]))
            .unwrap();

        // 인코딩된 세그먼트를 직접 변조하면 base64url이 깨지는 경우도 있음
        let (signed, signature) = token.rsplit_once('.').unwrap();
        for index in 0..signature.len() {
            let mut tampered = signature.as_bytes().to_vec();
            tampered[index] ^= 0x01;
            let tampered = String::from_utf8(tampered).unwrap();
            let forged = format!("{}.{}", signed, tampered);
            assert!(
                matches!(validator.parse(&forged), Err(AuthError::SignatureInvalid)),
                "char {} flip not reported as signature failure",
                index
            );
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = test_signer();
        let validator = test_validator();
        let token = signer
            .generate_token("u1", Some("c1"), "a@b.com", &roles(&["user"]))
            .unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut payload: Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        payload["roles"] = serde_json::json!(["superadmin"]);
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap()),
            parts[2]
        );

        assert!(matches!(
            validator.parse(&forged),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = test_signer();
        let validator = test_validator();

        let mut claims = signer.build_claims("u1", Some("c1"), "a@b.com", &[]).unwrap();
        claims.iat -= 7200;
        claims.exp = claims.iat + 3600;
        let token = signer.sign_claims(&claims).unwrap();

        assert!(matches!(validator.parse(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let signer = test_signer();
        let settings = TokenSettings {
            leeway_secs: 120,
            ..test_settings()
        };
        let lenient =
            TokenValidator::new(&test_key_pair().public, &settings).unwrap();

        let mut claims = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        claims.exp = Utc::now().timestamp() - 30;
        claims.iat = claims.exp - 3600;
        let token = signer.sign_claims(&claims).unwrap();

        assert!(lenient.parse(&token).is_ok());
        assert!(matches!(test_validator().parse(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_future_iat_and_nbf_rejected() {
        let signer = test_signer();
        let validator = test_validator();

        let mut claims = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        claims.iat += 3600;
        claims.exp += 3600;
        let token = signer.sign_claims(&claims).unwrap();
        assert!(matches!(validator.parse(&token), Err(AuthError::TokenNotYetValid)));

        let mut claims = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        claims.nbf = Some(claims.iat + 600);
        let token = signer.sign_claims(&claims).unwrap();
        assert!(matches!(validator.parse(&token), Err(AuthError::TokenNotYetValid)));
    }

    #[test]
    fn test_issuer_and_audience_enforced() {
        let signer = test_signer();
        let validator = test_validator();

        let mut claims = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        claims.iss = "someone-else".to_string();
        let token = signer.sign_claims(&claims).unwrap();
        assert!(matches!(validator.parse(&token), Err(AuthError::ClaimMismatch(_))));

        let mut claims = signer.build_claims("u1", None, "a@b.com", &[]).unwrap();
        claims.aud = "another-api".to_string();
        let token = signer.sign_claims(&claims).unwrap();
        assert!(matches!(validator.parse(&token), Err(AuthError::ClaimMismatch(_))));
    }

    #[test]
    fn test_other_algorithms_rejected() {
        let validator = test_validator();
        let payload = serde_json::json!({
            "sub": "u1", "company_id": "c1", "email": "a@b.com", "roles": ["superadmin"],
            "iss": "jupyter-platform", "aud": "jupyter-platform-api",
            "iat": Utc::now().timestamp(), "exp": Utc::now().timestamp() + 600, "jti": "x"
        });

        // alg=none, 서명 없음
        let none = forge_token(&serde_json::json!({"alg": "none", "typ": "JWT"}), &payload, "");
        assert!(matches!(validator.parse(&none), Err(AuthError::AlgorithmMismatch(_))));

        // 공개키를 HMAC 비밀로 쓰는 혼동 공격
        let hs256 = jsonwebtoken::encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(crate::auth::testutil::PUBLIC_PEM.as_bytes()),
        )
        .unwrap();
        assert!(matches!(validator.parse(&hs256), Err(AuthError::AlgorithmMismatch(_))));

        // RS512 (같은 키 계열이지만 고정 알고리즘이 아님)
        let rs512 = jsonwebtoken::encode(
            &Header::new(jsonwebtoken::Algorithm::RS512),
            &payload,
            &test_key_pair().private.encoding_key().unwrap(),
        )
        .unwrap();
        assert!(matches!(validator.parse(&rs512), Err(AuthError::AlgorithmMismatch(_))));

        let missing = forge_token(&serde_json::json!({"typ": "JWT"}), &payload, "c2ln");
        assert!(matches!(validator.parse(&missing), Err(AuthError::AlgorithmMismatch(_))));
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let rotated = KeyPair::new(
            PrivateKeyMaterial::from_pem(ROTATED_PRIVATE_PEM).unwrap(),
            PublicKeyMaterial::from_pem(ROTATED_PUBLIC_PEM).unwrap(),
        )
        .unwrap();
        let other_signer = TokenSigner::new(&rotated, test_settings()).unwrap();
        let token = other_signer
            .generate_token("u1", None, "a@b.com", &[])
            .unwrap();

        assert!(matches!(
            test_validator().parse(&token),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let validator = test_validator();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.e30.sig", "e30.e30.sig"] {
            let err = validator.parse(token).unwrap_err();
            assert!(
                matches!(err, AuthError::TokenMalformed(_) | AuthError::AlgorithmMismatch(_)),
                "unexpected error for {:?}: {:?}",
                token,
                err
            );
        }

        // 헤더가 객체가 아님
        let array_header = format!("{}.e30.sig", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(matches!(
            validator.parse(&array_header),
            Err(AuthError::TokenMalformed(_))
        ));
    }
}
