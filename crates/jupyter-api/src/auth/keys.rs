//! RSA 키 로딩.
//!
//! PEM 파일에서 서명용 개인키와 검증용 공개키를 읽고,
//! 공개키로부터 키 식별자(`kid`)를 계산합니다.
//!
//! 지원 형식:
//! - 개인키: PKCS#1 (`RSA PRIVATE KEY`), PKCS#8 (`PRIVATE KEY`)
//! - 공개키: SPKI (`PUBLIC KEY`), PKCS#1 (`RSA PUBLIC KEY`)

use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey},
    traits::PublicKeyParts,
    RsaPrivateKey, RsaPublicKey,
};
use sha2::{Digest, Sha256};
use tracing::info;

use super::AuthError;

/// 발급/검증에 사용하는 유일한 알고리즘.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// JOSE 헤더/JWK에 기록되는 알고리즘 이름.
pub const SIGNING_ALGORITHM_NAME: &str = "RS256";

/// PEM 블록 하나.
struct PemBlock {
    label: String,
    /// BEGIN/END 줄을 포함한 정규화된 PEM 텍스트
    text: String,
}

/// 입력에서 첫 번째 PEM 블록만 잘라냅니다.
///
/// 블록 앞뒤의 주석이나 공백, CRLF 줄바꿈은 무시됩니다.
fn extract_pem_block(input: &str) -> Result<PemBlock, AuthError> {
    const BEGIN: &str = "-----BEGIN ";
    const END: &str = "-----END ";
    const DASHES: &str = "-----";

    let start = input
        .find(BEGIN)
        .ok_or_else(|| AuthError::KeyLoadFailure("no PEM block found".to_string()))?;
    let rest = &input[start + BEGIN.len()..];
    let label_end = rest
        .find(DASHES)
        .ok_or_else(|| AuthError::KeyLoadFailure("unterminated PEM header".to_string()))?;
    let label = rest[..label_end].trim().to_string();

    let end_marker = format!("{}{}{}", END, label, DASHES);
    let end = input[start..]
        .find(&end_marker)
        .map(|i| start + i + end_marker.len())
        .ok_or_else(|| AuthError::KeyLoadFailure(format!("missing END line for {}", label)))?;

    let text = input[start..end]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(PemBlock {
        label,
        text: format!("{}\n", text),
    })
}

fn read_pem_file(path: &Path) -> Result<String, AuthError> {
    std::fs::read_to_string(path).map_err(|e| {
        AuthError::KeyLoadFailure(format!("cannot read {}: {}", path.display(), e))
    })
}

/// 공개키의 kid를 계산합니다.
///
/// `base64url(SHA-256(SubjectPublicKeyInfo DER))`. 컨테이너 형식이나
/// PEM 주석과 무관하게 같은 키는 같은 kid를 갖습니다.
pub fn compute_kid(key: &RsaPublicKey) -> Result<String, AuthError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| AuthError::KeyLoadFailure(format!("public key encoding: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(der.as_bytes())))
}

/// 검증/공개용 RSA 공개키.
#[derive(Clone)]
pub struct PublicKeyMaterial {
    key: RsaPublicKey,
    kid: String,
    n: String,
    e: String,
}

impl PublicKeyMaterial {
    /// PEM 텍스트에서 공개키를 읽습니다.
    pub fn from_pem(pem: &str) -> Result<Self, AuthError> {
        let block = extract_pem_block(pem)?;
        let key = match block.label.as_str() {
            "PUBLIC KEY" => RsaPublicKey::from_public_key_pem(&block.text)
                .map_err(|e| AuthError::KeyLoadFailure(format!("not an RSA public key: {}", e)))?,
            "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_pem(&block.text).map_err(|e| {
                AuthError::KeyLoadFailure(format!("invalid PKCS#1 public key: {}", e))
            })?,
            other => {
                return Err(AuthError::KeyLoadFailure(format!(
                    "unsupported public key block: {}",
                    other
                )))
            }
        };
        Self::from_key(key)
    }

    /// 파일에서 공개키를 읽습니다.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let material = Self::from_pem(&read_pem_file(path)?)?;
        info!(path = %path.display(), kid = %material.kid, "Public key loaded");
        Ok(material)
    }

    fn from_key(key: RsaPublicKey) -> Result<Self, AuthError> {
        let kid = compute_kid(&key)?;
        let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());
        Ok(Self { key, kid, n, e })
    }

    /// 키 식별자.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// base64url 인코딩된 modulus.
    pub fn modulus(&self) -> &str {
        &self.n
    }

    /// base64url 인코딩된 public exponent.
    pub fn exponent(&self) -> &str {
        &self.e
    }

    /// 토큰 검증용 키.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        DecodingKey::from_rsa_components(&self.n, &self.e)
            .map_err(|e| AuthError::KeyLoadFailure(format!("decoding key: {}", e)))
    }

    pub(crate) fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

impl std::fmt::Debug for PublicKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyMaterial")
            .field("kid", &self.kid)
            .field("bits", &(self.key.size() * 8))
            .finish()
    }
}

/// 서명용 RSA 개인키.
pub struct PrivateKeyMaterial {
    key: RsaPrivateKey,
}

impl PrivateKeyMaterial {
    /// PEM 텍스트에서 개인키를 읽습니다 (PKCS#1 또는 PKCS#8).
    pub fn from_pem(pem: &str) -> Result<Self, AuthError> {
        let block = extract_pem_block(pem)?;
        let key = match block.label.as_str() {
            "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_pem(&block.text).map_err(|e| {
                AuthError::KeyLoadFailure(format!("invalid PKCS#1 private key: {}", e))
            })?,
            "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_pem(&block.text).map_err(|e| {
                AuthError::KeyLoadFailure(format!("not an RSA private key: {}", e))
            })?,
            other => {
                return Err(AuthError::KeyLoadFailure(format!(
                    "unsupported private key block: {}",
                    other
                )))
            }
        };
        Ok(Self { key })
    }

    /// 파일에서 개인키를 읽습니다.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let material = Self::from_pem(&read_pem_file(path)?)?;
        info!(path = %path.display(), "Private key loaded");
        Ok(material)
    }

    /// 개인키에 대응하는 공개키.
    pub fn public_key(&self) -> Result<PublicKeyMaterial, AuthError> {
        PublicKeyMaterial::from_key(RsaPublicKey::from(&self.key))
    }

    /// 토큰 서명용 키.
    pub fn encoding_key(&self) -> Result<EncodingKey, AuthError> {
        let der = self
            .key
            .to_pkcs1_der()
            .map_err(|e| AuthError::KeyLoadFailure(format!("private key encoding: {}", e)))?;
        Ok(EncodingKey::from_rsa_der(der.as_bytes()))
    }
}

impl std::fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeyMaterial").finish_non_exhaustive()
    }
}

/// 개인키와 공개키 한 쌍.
#[derive(Debug)]
pub struct KeyPair {
    pub private: PrivateKeyMaterial,
    pub public: PublicKeyMaterial,
}

impl KeyPair {
    /// 두 PEM 파일을 읽고 서로 대응하는지 확인합니다.
    pub fn load(
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
    ) -> Result<Self, AuthError> {
        let private = PrivateKeyMaterial::from_file(private_path)?;
        let public = PublicKeyMaterial::from_file(public_path)?;
        Self::new(private, public)
    }

    /// 이미 읽은 키로 쌍을 구성합니다.
    pub fn new(private: PrivateKeyMaterial, public: PublicKeyMaterial) -> Result<Self, AuthError> {
        let derived = private.public_key()?;
        if derived.rsa() != public.rsa() {
            return Err(AuthError::KeyLoadFailure(
                "private key does not match public key".to_string(),
            ));
        }
        Ok(Self { private, public })
    }

    /// 키 식별자.
    pub fn kid(&self) -> &str {
        self.public.kid()
    }
}
