//! 테스트용 키 픽스처와 헬퍼.

use std::path::PathBuf;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

use super::keys::{KeyPair, PrivateKeyMaterial, PublicKeyMaterial};
use super::{TokenSettings, TokenSigner, TokenValidator};

pub const PRIVATE_PEM: &str = include_str!("../../tests/fixtures/jwt_private.pem");
pub const PRIVATE_PKCS8_PEM: &str = include_str!("../../tests/fixtures/jwt_private_pkcs8.pem");
pub const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/jwt_public.pem");
pub const PUBLIC_PKCS1_PEM: &str = include_str!("../../tests/fixtures/jwt_public_pkcs1.pem");
pub const ROTATED_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/rotated_private.pem");
pub const ROTATED_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/rotated_public.pem");
pub const EC_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/ec_private.pem");
pub const EC_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/ec_public.pem");

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn test_key_pair() -> KeyPair {
    KeyPair::new(
        PrivateKeyMaterial::from_pem(PRIVATE_PEM).unwrap(),
        PublicKeyMaterial::from_pem(PUBLIC_PEM).unwrap(),
    )
    .unwrap()
}

pub fn test_settings() -> TokenSettings {
    TokenSettings::default()
}

pub fn test_signer() -> TokenSigner {
    TokenSigner::new(&test_key_pair(), test_settings()).unwrap()
}

pub fn test_validator() -> TokenValidator {
    TokenValidator::new(&test_key_pair().public, &test_settings()).unwrap()
}

/// 임의의 헤더/페이로드와 서명 세그먼트로 토큰 문자열을 조립합니다.
pub fn forge_token(header: &Value, payload: &Value, signature: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap()),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap()),
        signature
    )
}
