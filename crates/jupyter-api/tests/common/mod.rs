//! 통합 테스트 공용 헬퍼.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use jupyter_api::auth::password::{hash_password_with, HashParams};
use jupyter_api::{create_router, AppState, InMemoryUserDirectory, UserDirectory, UserRecord};
use jupyter_core::config::AuthConfig;

pub const PASSWORD: &str = "Password1";

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        private_key_path: fixture("jwt_private.pem").to_string_lossy().into_owned(),
        public_key_path: fixture("jwt_public.pem").to_string_lossy().into_owned(),
        ..AuthConfig::default()
    }
}

/// 테넌트 c1의 admin/user, 테넌트 c2의 admin, 플랫폼 superadmin이 등록된 디렉터리.
pub async fn seeded_directory() -> Arc<InMemoryUserDirectory> {
    let directory = Arc::new(InMemoryUserDirectory::new());
    let users = [
        ("admin@acme.io", Some("c1"), "admin"),
        ("user@acme.io", Some("c1"), "user"),
        ("admin@globex.io", Some("c2"), "admin"),
        ("root@platform.io", None, "superadmin"),
    ];
    for (email, company, role) in users {
        let hash = hash_password_with(PASSWORD, &HashParams::LIGHT).unwrap();
        directory
            .create(UserRecord::new(email, hash, company.map(str::to_string), role))
            .await
            .unwrap();
    }
    directory
}

pub async fn test_state() -> Arc<AppState> {
    let users: Arc<dyn UserDirectory> = seeded_directory().await;
    Arc::new(AppState::from_config(&auth_config(), users).await.unwrap())
}

pub async fn test_app() -> (Router, Arc<AppState>) {
    let state = test_state().await;
    (create_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// 로그인 후 액세스 토큰을 반환합니다.
pub async fn login(app: &Router, email: &str) -> String {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            serde_json::json!({"email": email, "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "login failed for {}", email);
    response.json()["access_token"].as_str().unwrap().to_string()
}
