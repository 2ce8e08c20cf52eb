//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id 기반 해싱과 상수 시간 검증.
//!
//! 인코딩 형식은 `argon2id$v=19$m=65536,t=1,p=4$<salt>$<hash>`이며
//! salt/hash는 패딩 없는 표준 base64입니다. 검증 시에는 현재 기본값이 아닌
//! 문자열에 저장된 파라미터로 다시 계산합니다.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;

use super::AuthError;

/// 알고리즘 태그
const ALGORITHM_TAG: &str = "argon2id";

/// Argon2 버전 (0x13 = 19)
const VERSION_TAG: &str = "v=19";

/// salt 길이 (바이트)
pub const SALT_LEN: usize = 16;

/// 저장된 해시에서 허용하는 최대 메모리 비용 (1 GiB)
pub const MAX_MEMORY_KIB: u32 = 1024 * 1024;

/// 저장된 해시에서 허용하는 최대 반복 횟수
pub const MAX_ITERATIONS: u32 = 10;

/// 저장된 해시에서 허용하는 최대 병렬도
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2id 비용 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// 메모리 비용 (KiB)
    pub memory_kib: u32,
    /// 반복 횟수
    pub iterations: u32,
    /// 병렬도 (lanes)
    pub parallelism: u32,
    /// 출력 길이 (바이트)
    pub output_len: usize,
}

impl HashParams {
    /// 운영 기본값: 64 MiB, 1회, 4 lanes, 32바이트.
    pub const DEFAULT: HashParams = HashParams {
        memory_kib: 64 * 1024,
        iterations: 1,
        parallelism: 4,
        output_len: 32,
    };

    /// 테스트와 로컬 개발용 저비용 파라미터: 1 MiB, 1회, 1 lane.
    pub const LIGHT: HashParams = HashParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        output_len: 32,
    };

    fn hasher(&self) -> Result<Argon2<'static>, argon2::Error> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(self.output_len),
        )?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn derive(&self, password: &[u8], salt: &[u8]) -> Result<Vec<u8>, argon2::Error> {
        let mut out = vec![0u8; self.output_len];
        self.hasher()?.hash_password_into(password, salt, &mut out)?;
        Ok(out)
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// 비밀번호 해싱 (기본 파라미터).
///
/// # Example
///
/// ```rust,ignore
/// let encoded = hash_password("my_secure_password")?;
/// // "argon2id$v=19$m=65536,t=1,p=4$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with(password, &HashParams::DEFAULT)
}

/// 지정한 파라미터로 비밀번호를 해싱합니다.
///
/// 난수 소스를 사용할 수 없는 경우에만 실패합니다.
pub fn hash_password_with(password: &str, params: &HashParams) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| AuthError::HashingFailure(format!("salt generation: {}", e)))?;

    let hash = params
        .derive(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashingFailure(e.to_string()))?;

    Ok(format!(
        "{}${}$m={},t={},p={}${}${}",
        ALGORITHM_TAG,
        VERSION_TAG,
        params.memory_kib,
        params.iterations,
        params.parallelism,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(&hash),
    ))
}

/// 저장된 해시와 비밀번호를 비교합니다.
///
/// - 형식 오류 → [`AuthError::MalformedHash`]
/// - 불일치 → [`AuthError::InvalidCredentials`]
pub fn verify_password(encoded: &str, password: &str) -> Result<(), AuthError> {
    let parsed = ParsedHash::parse(encoded)?;

    let computed = parsed
        .params
        .derive(password.as_bytes(), &parsed.salt)
        .map_err(|e| AuthError::MalformedHash(format!("stored parameters rejected: {}", e)))?;

    if bool::from(computed.as_slice().ct_eq(parsed.hash.as_slice())) {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// 저장된 해시에서 복원한 파라미터/salt/해시.
#[derive(Debug)]
struct ParsedHash {
    params: HashParams,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl ParsedHash {
    fn parse(encoded: &str) -> Result<Self, AuthError> {
        // PHC 스타일의 선행 '$'도 허용
        let encoded = encoded.strip_prefix('$').unwrap_or(encoded);
        let parts: Vec<&str> = encoded.split('$').collect();
        if parts.len() != 5 {
            return Err(AuthError::MalformedHash(format!(
                "expected 5 fields, got {}",
                parts.len()
            )));
        }

        if parts[0] != ALGORITHM_TAG {
            return Err(AuthError::MalformedHash(format!(
                "unsupported algorithm: {}",
                parts[0]
            )));
        }
        if parts[1] != VERSION_TAG {
            return Err(AuthError::MalformedHash(format!(
                "unsupported version: {}",
                parts[1]
            )));
        }

        let (memory_kib, iterations, parallelism) = parse_cost(parts[2])?;

        let salt = STANDARD_NO_PAD
            .decode(parts[3])
            .map_err(|e| AuthError::MalformedHash(format!("salt: {}", e)))?;
        let hash = STANDARD_NO_PAD
            .decode(parts[4])
            .map_err(|e| AuthError::MalformedHash(format!("hash: {}", e)))?;

        if hash.is_empty() {
            return Err(AuthError::MalformedHash("empty hash".to_string()));
        }

        Ok(Self {
            params: HashParams {
                memory_kib,
                iterations,
                parallelism,
                output_len: hash.len(),
            },
            salt,
            hash,
        })
    }
}

/// `m=..,t=..,p=..` 파싱 (순서 무관, 세 값 모두 필수).
fn parse_cost(field: &str) -> Result<(u32, u32, u32), AuthError> {
    let mut memory = None;
    let mut time = None;
    let mut lanes = None;

    for pair in field.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| AuthError::MalformedHash(format!("bad parameter: {}", pair)))?;
        let value: u32 = value
            .parse()
            .map_err(|_| AuthError::MalformedHash(format!("bad parameter value: {}", pair)))?;
        let slot = match key {
            "m" => &mut memory,
            "t" => &mut time,
            "p" => &mut lanes,
            _ => {
                return Err(AuthError::MalformedHash(format!(
                    "unknown parameter: {}",
                    key
                )))
            }
        };
        if slot.replace(value).is_some() {
            return Err(AuthError::MalformedHash(format!(
                "duplicate parameter: {}",
                key
            )));
        }
    }

    let (m, t, p) = match (memory, time, lanes) {
        (Some(m), Some(t), Some(p)) => (m, t, p),
        _ => {
            return Err(AuthError::MalformedHash(
                "missing m/t/p parameters".to_string(),
            ))
        }
    };

    // 손상된 해시의 비용 상한
    if m > MAX_MEMORY_KIB || t > MAX_ITERATIONS || p > MAX_PARALLELISM {
        return Err(AuthError::MalformedHash(format!(
            "cost out of range: m={},t={},p={}",
            m, t, p
        )));
    }

    Ok((m, t, p))
}

/// 비밀번호 강도 검증.
///
/// # 요구사항
///
/// - 최소 8자 이상
/// - 최소 1개의 숫자 포함
/// - 최소 1개의 영문자 포함
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("password must be at least 8 characters");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain at least one digit");
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("password must contain at least one letter");
    }

    Ok(())
}
