//! End-to-end session lifecycle against real storage.
//!
//! These tests need PostgreSQL (DATABASE_URL) with migrations applied by
//! the harness below, so they are ignored by default, the same way the
//! pool test in `db/mod.rs` is.

mod common;

use axum::http::StatusCode;
use identity_service::{
    models::{PasswordResetToken, User, UserStatus},
    utils::{hash_password, Password},
};
use uuid::Uuid;

fn unique_email(tag: &str) -> String {
    format!("{}+{}@example.com", tag, Uuid::new_v4().simple())
}

fn register_body(email: &str, password: &str) -> String {
    format!(
        r#"{{"name": "Test User", "email": "{}", "password": "{}", "password_confirmation": "{}"}}"#,
        email, password, password
    )
}

fn login_body(email: &str, password: &str) -> String {
    format!(r#"{{"email": "{}", "password": "{}"}}"#, email, password)
}

async fn register(app: &common::TestApp, email: &str, password: &str) -> serde_json::Value {
    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/register",
        &register_body(email, password),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    common::envelope(response).await
}

async fn login(app: &common::TestApp, email: &str, password: &str) -> serde_json::Value {
    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/login",
        &login_body(email, password),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    common::envelope(response).await
}

fn token_of(envelope: &serde_json::Value) -> String {
    envelope["data"]["token"].as_str().unwrap().to_string()
}

fn user_id_of(envelope: &serde_json::Value) -> Uuid {
    envelope["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn register_then_duplicate_email_conflicts() {
    let app = common::db_app().await;
    let email = unique_email("register");

    let body = register(&app, &email, "longpass1").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["expires_in"], 3600);
    assert_eq!(body["data"]["user"]["email"], email.as_str());
    assert_eq!(body["data"]["user"]["status"], "active");

    // Same email again, case shuffled: conflict, not a second account.
    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/register",
        &register_body(&email.to_uppercase(), "longpass1"),
    )
    .await;
    common::assert_failure(response, StatusCode::CONFLICT, "CONFLICT").await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn wrong_password_fails_and_leaves_no_ledger_entry() {
    let app = common::db_app().await;
    let email = unique_email("wrongpass");

    let body = register(&app, &email, "longpass1").await;
    let user_id = user_id_of(&body);

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/login",
        &login_body(&email, "longpass2"),
    )
    .await;
    common::assert_failure(response, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS").await;

    let history = app.state.db.login_history(user_id, 10).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn inactive_account_fails_closed_with_the_same_error() {
    let app = common::db_app().await;
    let email = unique_email("inactive");

    let hash = hash_password(&Password::new("longpass1".to_string())).unwrap();
    let mut user = User::new(
        "Inactive User".to_string(),
        email.clone(),
        hash.into_string(),
        None,
    );
    user.status = UserStatus::Inactive.as_str().to_string();
    app.state.db.insert_user(&user).await.unwrap();

    // Correct password, inactive account: indistinguishable from a wrong
    // password so account existence never leaks.
    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/login",
        &login_body(&email, "longpass1"),
    )
    .await;
    common::assert_failure(response, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS").await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn sequential_logins_leave_exactly_one_open_entry() {
    let app = common::db_app().await;
    let email = unique_email("replace");

    let body = register(&app, &email, "longpass1").await;
    let user_id = user_id_of(&body);

    login(&app, &email, "longpass1").await;
    login(&app, &email, "longpass1").await;

    assert_eq!(app.state.db.count_open_logs(user_id).await.unwrap(), 1);

    let history = app.state.db.login_history(user_id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    // Newest first: the latest entry is the open one.
    assert!(history[0].is_open());
    assert!(!history[1].is_open());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn logout_closes_the_session_and_revokes_the_token() {
    let app = common::db_app().await;
    let email = unique_email("logout");

    let body = register(&app, &email, "longpass1").await;
    let user_id = user_id_of(&body);
    let token = token_of(&login(&app, &email, "longpass1").await);

    let response = common::send_authed(&app.router, "POST", "/v1/auth/logout", &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::envelope(response).await;
    assert_eq!(body["success"], true);

    assert_eq!(app.state.db.count_open_logs(user_id).await.unwrap(), 0);

    // The jti is on the deny-list now.
    let response = common::send_authed(&app.router, "POST", "/v1/auth/logout", &token, None).await;
    common::assert_failure(response, StatusCode::UNAUTHORIZED, "TOKEN_REVOKED").await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn logout_with_no_open_session_still_succeeds() {
    let app = common::db_app().await;
    let email = unique_email("noopsafe");

    // Registration issues a token but opens no ledger entry.
    let token = token_of(&register(&app, &email, "longpass1").await);

    let response = common::send_authed(&app.router, "POST", "/v1/auth/logout", &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::envelope(response).await["success"], true);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn refresh_rotates_the_token_and_revokes_the_old_one() {
    let app = common::db_app().await;
    let email = unique_email("refresh");

    register(&app, &email, "longpass1").await;
    let old_token = token_of(&login(&app, &email, "longpass1").await);

    let response =
        common::send_authed(&app.router, "POST", "/v1/auth/refresh", &old_token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::envelope(response).await;
    let new_token = token_of(&body);
    assert_ne!(new_token, old_token);
    assert_eq!(body["data"]["user"]["email"], email.as_str());

    // The replaced token is unusable against the gate.
    let response =
        common::send_authed(&app.router, "POST", "/v1/auth/logout", &old_token, None).await;
    common::assert_failure(response, StatusCode::UNAUTHORIZED, "TOKEN_REVOKED").await;

    // The fresh one works.
    let response =
        common::send_authed(&app.router, "POST", "/v1/auth/logout", &new_token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn me_resolves_the_principal_without_side_effects() {
    let app = common::db_app().await;
    let email = unique_email("me");

    register(&app, &email, "longpass1").await;
    let body = login(&app, &email, "longpass1").await;
    let user_id = user_id_of(&body);
    let token = token_of(&body);

    let response = common::send_authed(&app.router, "GET", "/v1/auth/me", &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::envelope(response).await;
    assert_eq!(body["data"]["email"], email.as_str());

    // Still exactly one open session: resolving identity is not a login.
    assert_eq!(app.state.db.count_open_logs(user_id).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn forgot_password_reports_whether_the_account_exists() {
    let app = common::db_app().await;
    let email = unique_email("forgot");

    register(&app, &email, "longpass1").await;

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/forgot-password",
        &format!(r#"{{"email": "{}"}}"#, email),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/forgot-password",
        r#"{"email": "nobody@example.com"}"#,
    )
    .await;
    common::assert_failure(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn reset_token_is_single_use_and_rewrites_the_credential() {
    let app = common::db_app().await;
    let email = unique_email("reset");

    let body = register(&app, &email, "longpass1").await;
    let user_id = user_id_of(&body);

    let raw_token = format!("reset-{}", Uuid::new_v4().simple());
    let record = PasswordResetToken::new(user_id, &raw_token, 60);
    app.state.db.insert_reset_token(&record).await.unwrap();

    let reset_body = format!(
        r#"{{"token": "{}", "password": "newlongpass1", "password_confirmation": "newlongpass1"}}"#,
        raw_token
    );
    let response =
        common::send_json(&app.router, "POST", "/v1/auth/reset-password", &reset_body).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password is dead, new one works.
    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/login",
        &login_body(&email, "longpass1"),
    )
    .await;
    common::assert_failure(response, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS").await;
    login(&app, &email, "newlongpass1").await;

    // Second redemption of the same token fails: single use.
    let response =
        common::send_json(&app.router, "POST", "/v1/auth/reset-password", &reset_body).await;
    common::assert_failure(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn expired_reset_token_is_rejected() {
    let app = common::db_app().await;
    let email = unique_email("resetexp");

    let body = register(&app, &email, "longpass1").await;
    let user_id = user_id_of(&body);

    let raw_token = format!("reset-{}", Uuid::new_v4().simple());
    let record = PasswordResetToken::new(user_id, &raw_token, 0);
    app.state.db.insert_reset_token(&record).await.unwrap();

    let reset_body = format!(
        r#"{{"token": "{}", "password": "newlongpass1", "password_confirmation": "newlongpass1"}}"#,
        raw_token
    );
    let response =
        common::send_json(&app.router, "POST", "/v1/auth/reset-password", &reset_body).await;
    common::assert_failure(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn login_history_is_visible_to_the_current_user() {
    let app = common::db_app().await;
    let email = unique_email("history");

    register(&app, &email, "longpass1").await;
    login(&app, &email, "longpass1").await;
    let token = token_of(&login(&app, &email, "longpass1").await);

    let response = common::send_authed(
        &app.router,
        "GET",
        "/v1/profile/login-history",
        &token,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::envelope(response).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["login_data"]["ip_address"], "127.0.0.1");
}
