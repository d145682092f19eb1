#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{NaiveTime, Utc};
use fooddb_gateway::{
    AppConfig, AppState, MockRepository, create_router,
    auth::TokenIssuer,
    models::{AdminRecord, Identity, Namespace, Role, Store, UserRecord},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

pub fn student() -> UserRecord {
    UserRecord {
        user_id: 7,
        login_id: "minji".to_string(),
        display_name: "Kim Minji".to_string(),
        stored_secret: "pw-minji".to_string(),
        student_id: Some("20231234".to_string()),
        provider_id: None,
    }
}

pub fn provider() -> UserRecord {
    UserRecord {
        user_id: 8,
        login_id: "owner".to_string(),
        display_name: "Park Jisoo".to_string(),
        stored_secret: "pw-owner".to_string(),
        student_id: None,
        provider_id: Some(3),
    }
}

/// A users row with neither a student number nor a provider id.
pub fn orphan_user() -> UserRecord {
    UserRecord {
        user_id: 9,
        login_id: "siteops".to_string(),
        display_name: "Ops Account".to_string(),
        stored_secret: "pw-ops".to_string(),
        student_id: None,
        provider_id: None,
    }
}

pub fn admin() -> AdminRecord {
    AdminRecord {
        admin_id: 42,
        login_id: "root".to_string(),
        display_name: "Site Admin".to_string(),
        stored_secret: "pw-admin".to_string(),
    }
}

pub fn store() -> Store {
    Store {
        store_id: 1,
        name: "Mom's Kitchen".to_string(),
        address: "12 Campus Rd".to_string(),
        open_time: NaiveTime::from_hms_opt(10, 0, 0),
        close_time: NaiveTime::from_hms_opt(21, 30, 0),
        phone: Some("02-123-4567".to_string()),
        distance_km: Some(0.4),
    }
}

pub fn seeded_repo() -> MockRepository {
    MockRepository::new()
        .with_user(student())
        .with_user(provider())
        .with_user(orphan_user())
        .with_admin(admin())
        .with_store(store())
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn app_state(repo: MockRepository) -> AppState {
    AppState::new(Arc::new(repo), test_config())
}

pub fn app(repo: MockRepository) -> Router {
    create_router(app_state(repo))
}

/// Admin identities come from the admin namespace; every other role from the user one.
pub fn identity(subject_id: i64, display_name: &str, role: Role) -> Identity {
    let namespace = if role == Role::Admin {
        Namespace::Admin
    } else {
        Namespace::User
    };
    Identity {
        subject_id,
        display_name: display_name.to_string(),
        role,
        namespace,
    }
}

/// Signs a token with the test secret, valid for one hour from now.
pub fn token_for(identity: &Identity) -> String {
    TokenIssuer::from_secret(TEST_JWT_SECRET)
        .issue_at(identity, chrono::Duration::hours(1), Utc::now())
        .expect("signing with an HMAC key cannot fail")
        .token
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Sends one request through the router and returns the status and the body parsed as
/// JSON (`Value::Null` for an empty or non-JSON body).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    read_json(app, request).await
}

/// Sends a body verbatim with the given `Content-Type` (none when `content_type` is None).
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    read_json(app, request).await
}

async fn read_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
