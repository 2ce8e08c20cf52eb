//! 로그인 → 보호된 endpoint → 가입 흐름.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use jupyter_api::{verify_password, AuthError};
use serde_json::json;

use common::{get_request, json_request, login, send, test_app, PASSWORD};

#[tokio::test]
async fn test_login_returns_bearer_token() {
    let (app, state) = test_app().await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({"email": "admin@acme.io", "password": PASSWORD}),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 86400);
    assert_eq!(body["company_id"], "c1");
    assert_eq!(body["email"], "admin@acme.io");
    assert_eq!(body["roles"], json!(["admin"]));

    let claims = state
        .validator
        .parse(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, body["user_id"].as_str().unwrap());
    assert_eq!(claims.tenant_id(), Some("c1"));
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let (app, _) = test_app().await;
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({"email": "  Admin@ACME.io ", "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _) = test_app().await;

    let wrong_password = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({"email": "admin@acme.io", "password": "Nope12345"}),
        ),
    )
    .await;
    let unknown_user = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({"email": "ghost@acme.io", "password": PASSWORD}),
        ),
    )
    .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
}

#[tokio::test]
async fn test_login_requires_fields() {
    let (app, _) = test_app().await;

    for body in [
        json!({"email": "", "password": PASSWORD}),
        json!({"email": "admin@acme.io"}),
        json!({}),
    ] {
        let response = send(
            &app,
            json_request(Method::POST, "/api/v1/auth/login", None, body),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["error"]["code"], "INVALID_INPUT");
    }
}

#[tokio::test]
async fn test_unparsable_bodies_use_error_envelope() {
    let (app, _) = test_app().await;

    let broken = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&app, broken).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"]["code"], "INVALID_INPUT");

    let untyped = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .body(Body::from(json!({"email": "admin@acme.io", "password": PASSWORD}).to_string()))
        .unwrap();
    let response = send(&app, untyped).await;
    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.json()["error"]["code"], "INVALID_INPUT");

    // 가입도 인증 통과 후 같은 형식
    let token = login(&app, "admin@acme.io").await;
    let broken = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("[1,2"))
        .unwrap();
    let response = send(&app, broken).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_unknown_user_hash_is_ready_at_startup() {
    let (_, state) = test_app().await;

    let hash = state.unknown_user_hash();
    assert!(hash.starts_with("argon2id$v=19$m=65536,t=1,p=4$"));
    assert!(matches!(
        verify_password(hash, PASSWORD),
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_me_reflects_token() {
    let (app, _) = test_app().await;

    let token = login(&app, "user@acme.io").await;
    let response = send(&app, get_request("/api/v1/auth/me", Some(&token))).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["company_id"], "c1");
    assert_eq!(body["email"], "user@acme.io");
    assert_eq!(body["roles"], json!(["user"]));

    // 플랫폼 운영자는 company_id가 null
    let token = login(&app, "root@platform.io").await;
    let response = send(&app, get_request("/api/v1/auth/me", Some(&token))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.json()["company_id"].is_null());
}

#[tokio::test]
async fn test_me_without_token_is_unauthorized() {
    let (app, _) = test_app().await;

    let response = send(&app, get_request("/api/v1/auth/me", None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers[header::WWW_AUTHENTICATE], "Bearer");

    let response = send(&app, get_request("/api/v1/auth/me", Some("garbage"))).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"]["message"], "invalid token");
}

#[tokio::test]
async fn test_admin_registers_user_in_own_tenant() {
    let (app, _) = test_app().await;
    let token = login(&app, "admin@acme.io").await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/register",
            Some(&token),
            json!({
                "email": "new@acme.io",
                "password": "Welcome123",
                "company_id": "c1",
                "role": "user"
            }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["email"], "new@acme.io");
    assert_eq!(body["company_id"], "c1");
    assert_eq!(body["role"], "user");
    assert!(uuid::Uuid::parse_str(body["user_id"].as_str().unwrap()).is_ok());

    // 새 사용자로 로그인 가능
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({"email": "new@acme.io", "password": "Welcome123"}),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    // 같은 이메일은 409
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/register",
            Some(&token),
            json!({
                "email": "NEW@acme.io",
                "password": "Welcome123",
                "company_id": "c1",
                "role": "user"
            }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let (app, _) = test_app().await;
    let token = login(&app, "admin@acme.io").await;

    let cases = [
        json!({"email": "x@acme.io", "password": "Welcome123", "company_id": "c1"}),
        json!({"email": "x@acme.io", "password": "short1", "company_id": "c1", "role": "user"}),
        json!({"email": "x@acme.io", "password": "Welcome123", "company_id": "c1", "role": "superadmin"}),
        json!({"email": "x@acme.io", "password": "Welcome123", "company_id": "c1", "role": "owner"}),
    ];
    for body in cases {
        let response = send(
            &app,
            json_request(Method::POST, "/api/v1/auth/register", Some(&token), body.clone()),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn test_register_role_and_tenant_enforcement() {
    let (app, _) = test_app().await;
    let payload = json!({
        "email": "x@acme.io",
        "password": "Welcome123",
        "company_id": "c1",
        "role": "user"
    });

    // 인증 없음 → 401
    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/auth/register", None, payload.clone()),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // 일반 사용자 → 403
    let user = login(&app, "user@acme.io").await;
    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/auth/register", Some(&user), payload.clone()),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"]["message"], "forbidden (insufficient role)");

    // 다른 테넌트 관리자 → 403
    let other_admin = login(&app, "admin@globex.io").await;
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/register",
            Some(&other_admin),
            payload.clone(),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // superadmin은 어느 테넌트든 가능
    let root = login(&app, "root@platform.io").await;
    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/auth/register", Some(&root), payload),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app().await;
    let response = send(&app, get_request("/health", None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "healthy");
    assert_eq!(response.json()["jwks_ready"], true);
}
