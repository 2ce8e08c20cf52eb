//! 공개키 디스커버리 (JWKS).
//!
//! 공개키로 JWKS 문서를 만들고, 직렬화된 바이트와 ETag를 함께
//! 스냅샷으로 캐시합니다. 읽기는 공유 락으로 `Arc`만 복제하고,
//! 재구성은 완성된 스냅샷을 쓰기 락 아래에서 통째로 교체합니다.
//!
//! # 상태
//!
//! `Uninitialized → Ready → Ready(재구성)`. 한 번 준비된 캐시는
//! 재구성이 실패해도 이전 스냅샷을 유지합니다.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::keys::{PublicKeyMaterial, SIGNING_ALGORITHM_NAME};
use super::AuthError;
use crate::metrics;

/// 디스커버리 응답의 캐시 지시자.
pub const JWKS_CACHE_CONTROL: &str = "public, max-age=3600, stale-while-revalidate=60";

/// JSON Web Key (RSA 공개키).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key Type
    pub kty: String,
    /// Public Key Use
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm
    pub alg: String,
    /// Key ID
    pub kid: String,
    /// RSA Modulus (base64url)
    pub n: String,
    /// RSA Exponent (base64url)
    pub e: String,
}

impl Jwk {
    /// 서명 검증용 RSA 공개키 항목.
    pub fn from_public_key(key: &PublicKeyMaterial) -> Self {
        Self {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            alg: SIGNING_ALGORITHM_NAME.to_string(),
            kid: key.kid().to_string(),
            n: key.modulus().to_string(),
            e: key.exponent().to_string(),
        }
    }
}

/// JWKS 문서.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

impl JwksDocument {
    /// kid로 키를 찾습니다.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// 직렬화된 바이트의 ETag (따옴표 포함).
///
/// `"` + base64url(SHA-256(bytes)[..16]) + `"`
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("\"{}\"", URL_SAFE_NO_PAD.encode(&digest[..16]))
}

/// 문서, 직렬화된 바이트, ETag 묶음.
///
/// 생성 후 변경되지 않습니다.
#[derive(Debug)]
pub struct JwksSnapshot {
    document: JwksDocument,
    body: Bytes,
    etag: String,
    etag_header: HeaderValue,
}

impl JwksSnapshot {
    /// 공개키로 스냅샷을 만듭니다.
    pub fn build(key: &PublicKeyMaterial) -> Result<Self, AuthError> {
        let document = JwksDocument {
            keys: vec![Jwk::from_public_key(key)],
        };
        let body = serde_json::to_vec(&document)
            .map_err(|e| AuthError::PublishFailure(format!("serialize: {}", e)))?;
        let etag = fingerprint(&body);
        let etag_header = HeaderValue::from_str(&etag)
            .map_err(|e| AuthError::PublishFailure(format!("etag header: {}", e)))?;

        Ok(Self {
            document,
            body: Bytes::from(body),
            etag,
            etag_header,
        })
    }

    pub fn document(&self) -> &JwksDocument {
        &self.document
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }
}

/// JWKS 캐시.
///
/// 애플리케이션 상태가 소유하며 핸들러에 참조로 전달됩니다.
#[derive(Debug)]
pub struct JwksCache {
    public_key_path: PathBuf,
    current: RwLock<Option<Arc<JwksSnapshot>>>,
    /// 지연 초기화가 동시에 여러 번 실행되지 않도록 직렬화
    init_lock: Mutex<()>,
}

impl JwksCache {
    /// 아직 초기화되지 않은 캐시를 만듭니다.
    pub fn new(public_key_path: impl Into<PathBuf>) -> Self {
        Self {
            public_key_path: public_key_path.into(),
            current: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// 설정된 공개키 파일로 스냅샷을 (재)구성합니다.
    pub async fn init(&self) -> Result<Arc<JwksSnapshot>, AuthError> {
        let path = self.public_key_path.clone();
        self.rebuild_from_file(&path).await
    }

    /// 지정한 공개키 파일로 스냅샷을 재구성합니다.
    ///
    /// 실패하면 기존 스냅샷은 그대로 남습니다.
    pub async fn rebuild_from_file(&self, path: &Path) -> Result<Arc<JwksSnapshot>, AuthError> {
        let pem = match tokio::fs::read_to_string(path).await {
            Ok(pem) => pem,
            Err(e) => {
                metrics::record_jwks_rebuild(false);
                return Err(AuthError::KeyLoadFailure(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        match PublicKeyMaterial::from_pem(&pem) {
            Ok(key) => self.rebuild_from(&key).await,
            Err(e) => {
                metrics::record_jwks_rebuild(false);
                Err(e)
            }
        }
    }

    /// 이미 읽은 공개키로 스냅샷을 재구성합니다.
    pub async fn rebuild_from(&self, key: &PublicKeyMaterial) -> Result<Arc<JwksSnapshot>, AuthError> {
        let snapshot = match JwksSnapshot::build(key) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                metrics::record_jwks_rebuild(false);
                return Err(e);
            }
        };

        // 완성된 스냅샷만 교체
        *self.current.write().await = Some(Arc::clone(&snapshot));

        metrics::record_jwks_rebuild(true);
        info!(kid = %key.kid(), etag = %snapshot.etag(), "JWKS snapshot rebuilt");
        Ok(snapshot)
    }

    /// 현재 스냅샷. 초기화 전이면 `None`.
    pub async fn snapshot(&self) -> Option<Arc<JwksSnapshot>> {
        self.current.read().await.clone()
    }

    /// 현재 문서의 복사본.
    pub async fn document(&self) -> Result<JwksDocument, AuthError> {
        self.snapshot()
            .await
            .map(|s| s.document.clone())
            .ok_or(AuthError::PublishUnavailable)
    }

    /// 현재 ETag.
    pub async fn etag(&self) -> Option<String> {
        self.snapshot().await.map(|s| s.etag.clone())
    }

    /// 현재 문서를 직렬화된 형태 그대로 기록합니다.
    pub async fn write_document<W: Write>(&self, mut writer: W) -> Result<(), AuthError> {
        let snapshot = self.snapshot().await.ok_or(AuthError::PublishUnavailable)?;
        writer
            .write_all(&snapshot.body)
            .and_then(|_| writer.flush())
            .map_err(|e| AuthError::PublishFailure(format!("write: {}", e)))
    }

    /// 스냅샷을 가져오고, 없으면 한 번 초기화를 시도합니다.
    async fn snapshot_or_init(&self) -> Result<Arc<JwksSnapshot>, AuthError> {
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot);
        }

        match self.init().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                error!(error = %e, "Lazy JWKS initialization failed");
                Err(AuthError::PublishUnavailable)
            }
        }
    }

    /// 디스커버리 요청을 처리합니다.
    ///
    /// GET/HEAD만 허용하며 `If-None-Match`, `Range`, `If-Range`를 따릅니다.
    pub async fn serve(&self, method: &Method, headers: &HeaderMap) -> Result<Response, AuthError> {
        let is_head = *method == Method::HEAD;
        if *method != Method::GET && !is_head {
            return Err(AuthError::MethodNotAllowed);
        }

        let snapshot = self.snapshot_or_init().await?;
        let total = snapshot.body.len() as u64;

        let mut response_headers = HeaderMap::new();
        response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response_headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(JWKS_CACHE_CONTROL));
        response_headers.insert(header::ETAG, snapshot.etag_header.clone());
        response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        if if_none_match(headers, &snapshot.etag) {
            debug!(etag = %snapshot.etag, "JWKS not modified");
            return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
        }

        let (status, body) = match requested_range(headers, &snapshot.etag, total) {
            ByteRange::Full => (StatusCode::OK, snapshot.body.clone()),
            ByteRange::Partial { start, end } => {
                response_headers.insert(
                    header::CONTENT_RANGE,
                    header_value(&format!("bytes {}-{}/{}", start, end, total))?,
                );
                let slice = snapshot.body.slice(start as usize..=end as usize);
                (StatusCode::PARTIAL_CONTENT, slice)
            }
            ByteRange::Unsatisfiable => {
                response_headers.insert(
                    header::CONTENT_RANGE,
                    header_value(&format!("bytes */{}", total))?,
                );
                return Ok((StatusCode::RANGE_NOT_SATISFIABLE, response_headers).into_response());
            }
        };

        response_headers.insert(header::CONTENT_LENGTH, header_value(&body.len().to_string())?);
        let body = if is_head { Body::empty() } else { Body::from(body) };
        Ok((status, response_headers, body).into_response())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|e| AuthError::PublishFailure(format!("header: {}", e)))
}

/// `If-None-Match` 중 하나라도 현재 ETag(또는 `*`)와 일치하는지.
///
/// 약한 비교: `W/` 접두사는 무시합니다.
fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|tag| tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag)
}

/// 요청된 바이트 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    /// 전체 본문
    Full,
    /// 포함 범위 `[start, end]`
    Partial { start: u64, end: u64 },
    /// 만족할 수 없는 범위
    Unsatisfiable,
}

fn requested_range(headers: &HeaderMap, etag: &str, total: u64) -> ByteRange {
    let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return ByteRange::Full;
    };

    // If-Range는 강한 비교
    if let Some(if_range) = headers.get(header::IF_RANGE) {
        if if_range.to_str().ok().map(str::trim) != Some(etag) {
            return ByteRange::Full;
        }
    }

    parse_range(range, total)
}

/// `bytes=` 단일 범위만 지원하고, 다중/해석 불가 범위는 전체 응답으로 처리합니다.
fn parse_range(value: &str, total: u64) -> ByteRange {
    let Some(ranges) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = ranges.trim().split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // suffix: 마지막 n 바이트
        let Ok(suffix) = last.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || total == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: total.saturating_sub(suffix),
            end: total - 1,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= total {
        return ByteRange::Unsatisfiable;
    }

    ByteRange::Partial {
        start,
        end: end.map_or(total - 1, |e| e.min(total - 1)),
    }
}

/// 디스커버리 엔드포인트 응답을 만들고 결과를 기록합니다.
pub async fn serve_discovery(cache: &JwksCache, method: &Method, headers: &HeaderMap) -> Response {
    let response = match cache.serve(method, headers).await {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, AuthError::MethodNotAllowed) {
                debug!(method = %method, "JWKS method not allowed");
            } else {
                warn!(error = %e, reason = e.reason(), "JWKS request failed");
            }
            e.into_response()
        }
    };
    metrics::record_jwks_request(response.status().as_u16());
    response
}
