//! Field-level validation failures reject before any storage access and
//! come back in the standard envelope.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn register_rejects_short_password_with_field_detail() {
    let app = common::lazy_app();

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/register",
        r#"{"name": "A", "email": "a@x.com", "password": "short", "password_confirmation": "short"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = common::envelope(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["errors"]["password"][0]
        .as_str()
        .unwrap()
        .contains("at least 8"));
}

#[tokio::test]
async fn register_rejects_mismatched_confirmation() {
    let app = common::lazy_app();

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/register",
        r#"{"name": "A", "email": "a@x.com", "password": "longpass1", "password_confirmation": "longpass2"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = common::envelope(response).await;
    assert!(body["errors"]["password_confirmation"].is_array());
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = common::lazy_app();

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/register",
        r#"{"name": "A", "email": "nope", "password": "longpass1", "password_confirmation": "longpass1"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = common::envelope(response).await;
    assert_eq!(body["errors"]["email"][0], "Invalid email format");
}

#[tokio::test]
async fn login_requires_well_formed_email_and_password() {
    let app = common::lazy_app();

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/login",
        r#"{"email": "nope", "password": ""}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = common::envelope(response).await;
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
}

#[tokio::test]
async fn reset_password_requires_confirmation_match() {
    let app = common::lazy_app();

    let response = common::send_json(
        &app.router,
        "POST",
        "/v1/auth/reset-password",
        r#"{"token": "abc", "password": "newlongpass1", "password_confirmation": "different1"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = common::lazy_app();

    let response =
        common::send_json(&app.router, "POST", "/v1/auth/register", "{not json").await;

    common::assert_failure(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}
