//! Jupyter 플랫폼 인증 API 서버 진입점.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use jupyter_api::seed::{seed_superadmin, SuperadminSeed};
use jupyter_api::{create_router, setup_metrics_recorder, AppState, InMemoryUserDirectory};
use jupyter_core::config::AppConfig;
use jupyter_core::logging::{init_logging, LogConfig};

/// 설정 파일 경로 (`JUPYTER_CONFIG`로 변경 가능).
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// CORS 레이어 생성.
///
/// - `CORS_ORIGINS`: 쉼표로 구분된 허용 origin 목록. 없으면 모든 origin 허용
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::HEAD,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::IF_NONE_MATCH,
            axum::http::header::RANGE,
        ])
}

fn build_app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config_path =
        std::env::var("JUPYTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!("Starting Jupyter auth API server...");

    // 키 경로가 없으면 시작하지 않음
    config.validate().context("invalid configuration")?;

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    let users = Arc::new(InMemoryUserDirectory::new());

    if let Some(seed) = SuperadminSeed::from_env() {
        seed_superadmin(users.as_ref(), &seed)
            .await
            .context("failed to seed superadmin")?;
    }

    // 키 로드 실패는 치명적: 서명/검증 키 없이 트래픽을 받지 않음
    let state = AppState::from_config(&config.auth, users)
        .await
        .map_err(|e| {
            error!(error = %e, "Key material could not be loaded");
            e
        })
        .context("failed to initialize authentication state")?
        .with_metrics(metrics_handle);

    let app = build_app(
        Arc::new(state),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, "API server listening");
    info!("JWKS available at http://{}/.well-known/jwks.json", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM을 기다립니다. 핸들러 설치에 실패하면
/// 해당 시그널은 무시하고 다른 시그널만 기다립니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
