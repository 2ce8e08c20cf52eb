//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! 인증/인가 결과와 JWKS 제공 현황을 카운터로 수집하고
//! `/metrics` 엔드포인트로 노출합니다.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설치하고 핸들을 반환합니다.
///
/// # 반환값
///
/// `/metrics` 엔드포인트에서 메트릭을 렌더링하기 위한 `PrometheusHandle`.
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

// ============================================================================
// 인증 메트릭
// ============================================================================

/// 인증 미들웨어 통과/거부 카운터.
pub fn record_auth_request(accepted: bool) {
    let result = if accepted { "accepted" } else { "rejected" };
    counter!("auth_requests_total", "result" => result).increment(1);
}

/// 인증 실패 원인별 카운터.
pub fn record_auth_failure(reason: &'static str) {
    counter!("auth_failures_total", "reason" => reason).increment(1);
}

/// 역할 가드 거부 카운터.
pub fn record_role_denial(reason: &'static str) {
    counter!("role_guard_denials_total", "reason" => reason).increment(1);
}

/// 로그인 시도 카운터 (success, invalid_credentials, error).
pub fn record_login_attempt(result: &'static str) {
    counter!("login_attempts_total", "result" => result).increment(1);
}

// ============================================================================
// JWKS 메트릭
// ============================================================================

/// 디스커버리 응답 상태 코드별 카운터.
pub fn record_jwks_request(status: u16) {
    counter!("jwks_requests_total", "status" => status.to_string()).increment(1);
}

/// 디스커버리 문서 재구성 카운터.
pub fn record_jwks_rebuild(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("jwks_rebuilds_total", "result" => result).increment(1);
}
