mod support;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use fooddb_gateway::{
    MockRepository,
    auth::{TokenIssuer, TokenVerifier},
    models::{Role, UserRecord},
};
use serde_json::{Value, json};
use support::{TEST_JWT_SECRET, app, identity, seeded_repo, send, send_raw, token_for};

const FORM: &str = "application/x-www-form-urlencoded";

fn kind(body: &Value) -> &str {
    body["kind"].as_str().unwrap_or_default()
}

fn student_token() -> String {
    token_for(&identity(7, "Kim Minji", Role::Student))
}

fn provider_token() -> String {
    token_for(&identity(8, "Park Jisoo", Role::Provider))
}

fn admin_token() -> String {
    token_for(&identity(42, "Site Admin", Role::Admin))
}

// --- Login ---

#[tokio::test]
async fn test_health_is_public() {
    let (status, _) = send(&app(seeded_repo()), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_login_issues_six_hour_token() {
    let (status, body) = send(
        &app(seeded_repo()),
        Method::POST,
        "/login",
        None,
        Some(json!({"login_id": "minji", "secret": "pw-minji"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["identity"]["subject_id"], 7);
    assert_eq!(body["identity"]["role"], "student");

    let claims = TokenVerifier::from_secret(TEST_JWT_SECRET)
        .verify_at(body["token"].as_str().unwrap(), Utc::now())
        .unwrap();
    assert_eq!(claims.expires_at - claims.issued_at, 6 * 60 * 60);
    assert_eq!(claims.role, Role::Student);
}

#[tokio::test]
async fn test_admin_login_issues_two_hour_admin_token() {
    let (status, body) = send(
        &app(seeded_repo()),
        Method::POST,
        "/admin_login",
        None,
        Some(json!({"login_id": "root", "pw": "pw-admin"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["role"], "admin");

    let claims = TokenVerifier::from_secret(TEST_JWT_SECRET)
        .verify_at(body["token"].as_str().unwrap(), Utc::now())
        .unwrap();
    assert_eq!(claims.subject_id, 42);
    assert_eq!(claims.expires_at - claims.issued_at, 2 * 60 * 60);
}

#[tokio::test]
async fn test_login_failures_are_distinguished() {
    let app = app(seeded_repo());
    let cases = [
        ("/login", json!({"login_id": "minji"}), StatusCode::BAD_REQUEST, "missing_credential"),
        ("/login", json!({}), StatusCode::BAD_REQUEST, "missing_credential"),
        ("/login", json!({"login_id": "ghost", "secret": "x"}), StatusCode::UNAUTHORIZED, "unknown_principal"),
        ("/login", json!({"login_id": "minji", "secret": "x"}), StatusCode::UNAUTHORIZED, "secret_mismatch"),
        ("/login", json!({"login_id": "root", "secret": "pw-admin"}), StatusCode::UNAUTHORIZED, "unknown_principal"),
        ("/login", json!({"login_id": "siteops", "secret": "pw-ops"}), StatusCode::FORBIDDEN, "namespace_mismatch"),
        ("/admin_login", json!({"login_id": "minji", "secret": "pw-minji"}), StatusCode::UNAUTHORIZED, "unknown_principal"),
        ("/admin_login", json!({"login_id": "root", "secret": "pw-wrong"}), StatusCode::UNAUTHORIZED, "secret_mismatch"),
    ];

    for (uri, payload, expected_status, expected_kind) in cases {
        let (status, body) = send(&app, Method::POST, uri, None, Some(payload.clone())).await;
        assert_eq!(status, expected_status, "{uri} {payload}");
        assert_eq!(kind(&body), expected_kind, "{uri} {payload}");
        assert!(body.get("token").is_none());
    }
}

#[tokio::test]
async fn test_login_accepts_form_post() {
    let (status, body) = send_raw(
        &app(seeded_repo()),
        Method::POST,
        "/login",
        Some(FORM),
        "login_id=minji&pw=pw-minji",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["subject_id"], 7);
}

#[tokio::test]
async fn test_unreadable_login_body_keeps_error_shape() {
    let app = app(seeded_repo());
    let cases = [
        (None, "", StatusCode::BAD_REQUEST, "missing_credential"),
        (Some("text/plain"), "login_id=minji", StatusCode::BAD_REQUEST, "invalid_request"),
        (Some("application/json"), "{not json", StatusCode::BAD_REQUEST, "invalid_request"),
        (Some("application/json"), r#"{"login_id": 7}"#, StatusCode::BAD_REQUEST, "invalid_request"),
    ];

    for (content_type, raw, expected_status, expected_kind) in cases {
        let (status, body) = send_raw(&app, Method::POST, "/admin_login", content_type, raw).await;
        assert_eq!(status, expected_status, "{content_type:?} {raw}");
        assert_eq!(kind(&body), expected_kind, "{content_type:?} {raw}");
        assert!(body["message"].is_string(), "{content_type:?} {raw}");
    }
}

#[tokio::test]
async fn test_login_during_store_outage_is_dependency_failure() {
    let (status, body) = send(
        &app(MockRepository::new_failing()),
        Method::POST,
        "/login",
        None,
        Some(json!({"login_id": "minji", "secret": "pw-minji"})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(kind(&body), "dependency_failure");
    assert!(!body["message"].as_str().unwrap().contains("simulated"));
}

// --- Signup ---

fn student_signup() -> Value {
    json!({
        "login_id": "yuna", "pw": "pw-yuna", "name": "Choi Yuna", "type": "student",
        "student_id": "20249999", "school": "Campus University"
    })
}

#[tokio::test]
async fn test_student_signup_then_login() {
    let app = app(seeded_repo());

    let (status, created) = send(&app, Method::POST, "/signup", None, Some(student_signup())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "student");
    assert_eq!(created["namespace"], "user");
    assert_eq!(created["display_name"], "Choi Yuna");

    let (status, login) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({"login_id": "yuna", "secret": "pw-yuna"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["identity"]["subject_id"], created["subject_id"]);
    assert_eq!(login["identity"]["role"], "student");
}

#[tokio::test]
async fn test_provider_signup_by_form_then_login() {
    let app = app(seeded_repo());

    let (status, created) = send_raw(
        &app,
        Method::POST,
        "/signup",
        Some(FORM),
        "login_id=cafehan&pw=pw-cafe&name=Han+Seojun&type=provider&store_name=Cafe+Han&business_number=123-45-67890",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "provider");

    let (status, login) = send_raw(&app, Method::POST, "/login", Some(FORM), "login_id=cafehan&pw=pw-cafe").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["identity"]["role"], "provider");
}

#[tokio::test]
async fn test_signup_rejects_taken_login_or_student_id() {
    let app = app(seeded_repo());

    let mut taken_login = student_signup();
    taken_login["login_id"] = json!("minji");
    let mut taken_student_id = student_signup();
    taken_student_id["student_id"] = json!("20231234");

    for payload in [taken_login, taken_student_id] {
        let (status, body) = send(&app, Method::POST, "/signup", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT, "{payload}");
        assert_eq!(kind(&body), "conflict", "{payload}");
    }

    // The original account is untouched.
    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({"login_id": "minji", "secret": "pw-minji"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_validates_fields_by_account_type() {
    let app = app(seeded_repo());
    let without = |field: &str| {
        let mut payload = student_signup();
        payload.as_object_mut().unwrap().remove(field);
        payload
    };
    let mut provider_without_store = student_signup();
    provider_without_store["type"] = json!("provider");
    provider_without_store["business_number"] = json!("123-45-67890");
    let mut unknown_type = student_signup();
    unknown_type["type"] = json!("admin");

    let cases = [
        (without("pw"), "missing_credential"),
        (without("login_id"), "missing_credential"),
        (without("name"), "invalid_request"),
        (without("school"), "invalid_request"),
        (without("student_id"), "invalid_request"),
        (without("type"), "invalid_request"),
        (provider_without_store, "invalid_request"),
        (unknown_type, "invalid_request"),
    ];

    for (payload, expected_kind) in cases {
        let (status, body) = send(&app, Method::POST, "/signup", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(kind(&body), expected_kind, "{payload}");
    }
}

#[tokio::test]
async fn test_signup_during_store_outage_is_dependency_failure() {
    let (status, body) = send(
        &app(MockRepository::new_failing()),
        Method::POST,
        "/signup",
        None,
        Some(student_signup()),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(kind(&body), "dependency_failure");
}

// --- Gate on the real routes ---

#[tokio::test]
async fn test_preflight_on_gated_paths_is_ok_without_token() {
    let app = app(seeded_repo());

    for uri in ["/me", "/api/inquiries", "/api/admin/inquiries", "/api/admin/inquiries/1/answer"] {
        let (status, body) = send(&app, Method::OPTIONS, uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, Value::Null, "{uri}");
    }
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let app = app(seeded_repo());

    let (missing, missing_body) = send(&app, Method::GET, "/me", None, None).await;
    let (garbage, garbage_body) = send(&app, Method::GET, "/me", Some("abc.def.ghi"), None).await;
    let (ok, me) = send(&app, Method::GET, "/me", Some(&provider_token()), None).await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(kind(&missing_body), "missing_token");
    assert_eq!(garbage, StatusCode::UNAUTHORIZED);
    assert_eq!(kind(&garbage_body), "invalid_signature");
    assert_eq!(ok, StatusCode::OK);
    assert_eq!(
        me,
        json!({"subject_id": 8, "display_name": "Park Jisoo", "role": "provider", "namespace": "user"})
    );
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let issued = TokenIssuer::from_secret(TEST_JWT_SECRET)
        .issue_at(
            &identity(42, "Site Admin", Role::Admin),
            Duration::hours(2),
            Utc::now() - Duration::hours(3),
        )
        .unwrap();

    let (status, body) = send(
        &app(seeded_repo()),
        Method::GET,
        "/api/admin/inquiries",
        Some(&issued.token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(kind(&body), "expired");
}

#[tokio::test]
async fn test_token_from_other_deployment_is_rejected() {
    let foreign = TokenIssuer::from_secret("another-deployment-secret")
        .issue(&identity(42, "Site Admin", Role::Admin), Duration::hours(2))
        .unwrap();

    let (status, body) = send(
        &app(seeded_repo()),
        Method::GET,
        "/api/admin/stores/1",
        Some(&foreign.token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(kind(&body), "invalid_signature");
}

#[tokio::test]
async fn test_admin_routes_forbid_non_admins() {
    let app = app(seeded_repo());

    for token in [student_token(), provider_token(), token_for(&identity(5, "Nobody", Role::Unset))] {
        let (status, body) = send(&app, Method::GET, "/api/admin/inquiries", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(kind(&body), "insufficient_role");
    }

    let (status, _) = send(&app, Method::GET, "/api/admin/inquiries", Some(&admin_token()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_paths_are_not_found() {
    let app = app(seeded_repo());

    for (uri, token) in [
        ("/no/such/path", None),
        ("/api/admin/nope", None),
        ("/api/admin/nope", Some(admin_token())),
        ("/api/nope", Some(student_token())),
    ] {
        let (status, body) = send(&app, Method::GET, uri, token.as_deref(), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(kind(&body), "not_found", "{uri}");
    }
}

#[tokio::test]
async fn test_malformed_path_id_is_invalid_request() {
    let (status, body) = send(
        &app(seeded_repo()),
        Method::GET,
        "/api/inquiries/abc",
        Some(&student_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(kind(&body), "invalid_request");
}

#[tokio::test]
async fn test_gate_runs_before_body_validation() {
    let (status, body) = send(
        &app(seeded_repo()),
        Method::POST,
        "/api/inquiries",
        None,
        Some(json!({"title": ""})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(kind(&body), "missing_token");
}

#[tokio::test]
async fn test_login_token_opens_gated_routes() {
    let app = app(seeded_repo());
    let (_, login) = send(
        &app,
        Method::POST,
        "/admin_login",
        None,
        Some(json!({"login_id": "root", "secret": "pw-admin"})),
    )
    .await;
    let token = login["token"].as_str().unwrap();

    let (status, store) = send(&app, Method::GET, "/api/admin/stores/1", Some(token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(store["name"], "Mom's Kitchen");
}

// --- Inquiries ---

#[tokio::test]
async fn test_inquiry_owner_comes_from_identity() {
    let app = app(seeded_repo());
    let student = student_token();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/inquiries",
        Some(&student),
        Some(json!({"title": "Wrong hours", "content": "Closes at 9, not 10", "user_id": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["inquiry_id"].as_i64().unwrap();

    let (_, mine) = send(&app, Method::GET, "/api/inquiries/me", Some(&student), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["inquiry_id"], id);

    let (_, theirs) = send(&app, Method::GET, "/api/inquiries/me", Some(&provider_token()), None).await;
    assert!(theirs.as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::GET, &format!("/api/inquiries/{id}"), Some(&provider_token()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(kind(&body), "not_found");
}

/// A student whose `users.user_id` equals the seeded admin's `admin_id`.
fn student_sharing_admin_id() -> UserRecord {
    UserRecord {
        user_id: 42,
        login_id: "dohyun".to_string(),
        display_name: "Lee Dohyun".to_string(),
        stored_secret: "pw-dohyun".to_string(),
        student_id: Some("20240042".to_string()),
        provider_id: None,
    }
}

#[tokio::test]
async fn test_admin_cannot_act_as_user_with_same_id() {
    let app = app(seeded_repo().with_user(student_sharing_admin_id()));
    let student = token_for(&identity(42, "Lee Dohyun", Role::Student));
    let admin = admin_token();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/inquiries",
        Some(&student),
        Some(json!({"title": "Refund", "content": "Private details"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["inquiry_id"].as_i64().unwrap();

    let requests = [
        (Method::GET, "/api/inquiries/me".to_string(), None),
        (Method::GET, format!("/api/inquiries/{id}"), None),
        (
            Method::POST,
            "/api/inquiries".to_string(),
            Some(json!({"title": "t", "content": "c"})),
        ),
        (
            Method::POST,
            "/api/stores/1/reviews".to_string(),
            Some(json!({"content": "c", "rating": 4})),
        ),
    ];
    for (method, uri, payload) in requests {
        let (status, body) = send(&app, method.clone(), &uri, Some(&admin), payload).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(kind(&body), "namespace_mismatch", "{method} {uri}");
    }

    // Admin views go through the admin routes, and the student still owns the inquiry.
    let (_, all) = send(&app, Method::GET, "/api/admin/inquiries", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    let (status, mine) = send(&app, Method::GET, "/api/inquiries/me", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["inquiry_id"], id);
}

#[tokio::test]
async fn test_inquiry_requires_title_and_content() {
    let (status, body) = send(
        &app(seeded_repo()),
        Method::POST,
        "/api/inquiries",
        Some(&student_token()),
        Some(json!({"title": "  ", "content": "text"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(kind(&body), "invalid_request");
}

#[tokio::test]
async fn test_admin_answers_inquiry() {
    let app = app(seeded_repo());
    let student = student_token();
    let admin = admin_token();

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/inquiries",
        Some(&student),
        Some(json!({"title": "Menu", "writer": "Minji", "field": "store", "content": "Add prices"})),
    )
    .await;
    let id = created["inquiry_id"].as_i64().unwrap();

    let (listed, all) = send(&app, Method::GET, "/api/admin/inquiries", Some(&admin), None).await;
    assert_eq!(listed, StatusCode::OK);
    assert_eq!(all[0]["inquiry_id"], id);
    assert_eq!(all[0]["answer"], Value::Null);

    let uri = format!("/api/admin/inquiries/{id}/answer");
    let (forbidden, _) = send(&app, Method::POST, &uri, Some(&student), Some(json!({"answer": "mine"}))).await;
    assert_eq!(forbidden, StatusCode::FORBIDDEN);

    let (missing, _) = send(&app, Method::POST, &uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(missing, StatusCode::BAD_REQUEST);

    let (answered, _) = send(&app, Method::POST, &uri, Some(&admin), Some(json!({"answer": "Done"}))).await;
    assert_eq!(answered, StatusCode::NO_CONTENT);

    let (_, inquiry) = send(&app, Method::GET, &format!("/api/inquiries/{id}"), Some(&student), None).await;
    assert_eq!(inquiry["answer"], "Done");
    assert_eq!(inquiry["user_id"], 7);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/inquiries/999/answer",
        Some(&admin),
        Some(json!({"answer": "?"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Reviews ---

#[tokio::test]
async fn test_review_validation_and_store_lookup() {
    let app = app(seeded_repo());
    let token = student_token();

    let (created, review) = send(
        &app,
        Method::POST,
        "/api/stores/1/reviews",
        Some(&token),
        Some(json!({"content": "Great kimbap", "rating": 5})),
    )
    .await;
    assert_eq!(created, StatusCode::CREATED);
    assert_eq!(review["user_id"], 7);
    assert_eq!(review["store_id"], 1);

    let (bad_rating, _) = send(
        &app,
        Method::POST,
        "/api/stores/1/reviews",
        Some(&token),
        Some(json!({"content": "Too good", "rating": 9})),
    )
    .await;
    assert_eq!(bad_rating, StatusCode::BAD_REQUEST);

    let (no_store, body) = send(
        &app,
        Method::POST,
        "/api/stores/99/reviews",
        Some(&token),
        Some(json!({"content": "Where?", "rating": 3})),
    )
    .await;
    assert_eq!(no_store, StatusCode::NOT_FOUND);
    assert_eq!(kind(&body), "not_found");
}

// --- Stores (admin) ---

#[tokio::test]
async fn test_admin_store_edit_and_delete() {
    let app = app(seeded_repo());
    let admin = admin_token();

    let (updated, store) = send(
        &app,
        Method::PUT,
        "/api/admin/stores/1",
        Some(&admin),
        Some(json!({"name": "Mom's Kitchen 2", "address": "14 Campus Rd"})),
    )
    .await;
    assert_eq!(updated, StatusCode::OK);
    assert_eq!(store["name"], "Mom's Kitchen 2");
    assert_eq!(store["phone"], "02-123-4567");
    assert_eq!(store["open"], "10:00:00");
    assert_eq!(store["distance"], 0.4);

    let (updated, store) = send(
        &app,
        Method::PUT,
        "/api/admin/stores/1",
        Some(&admin),
        Some(json!({
            "name": "Mom's Kitchen 2", "address": "14 Campus Rd",
            "close": "22:00:00", "distance": 1.2
        })),
    )
    .await;
    assert_eq!(updated, StatusCode::OK);
    assert_eq!(store["close"], "22:00:00");
    assert_eq!(store["distance"], 1.2);
    assert_eq!(store["open"], "10:00:00");

    let (invalid, body) = send(
        &app,
        Method::PUT,
        "/api/admin/stores/1",
        Some(&admin),
        Some(json!({"name": "No address"})),
    )
    .await;
    assert_eq!(invalid, StatusCode::BAD_REQUEST);
    assert_eq!(kind(&body), "invalid_request");

    let (deleted, _) = send(&app, Method::DELETE, "/api/admin/stores/1", Some(&admin), None).await;
    assert_eq!(deleted, StatusCode::NO_CONTENT);

    let (gone, _) = send(&app, Method::GET, "/api/admin/stores/1", Some(&admin), None).await;
    assert_eq!(gone, StatusCode::NOT_FOUND);

    let (again, _) = send(&app, Method::DELETE, "/api/admin/stores/1", Some(&admin), None).await;
    assert_eq!(again, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_operation_outage_is_dependency_failure() {
    let (status, body) = send(
        &app(MockRepository::new_failing()),
        Method::GET,
        "/api/inquiries/me",
        Some(&student_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(kind(&body), "dependency_failure");
}
