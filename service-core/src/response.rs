//! JSON response envelope shared by every endpoint.
//!
//! Success and failure both serialize to the same shape so clients can
//! branch on `success` and `error_code` alone:
//! `{success, message, data|errors, error_code, meta: {timestamp, status_code}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub timestamp: String,
    pub status_code: u16,
}

impl Meta {
    pub fn now(status: StatusCode) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            status_code: status.as_u16(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub meta: Meta,
}

/// 200 envelope with data.
pub fn ok<T: Serialize>(data: T, message: &str) -> Response {
    with_status(StatusCode::OK, Some(data), message)
}

/// 201 envelope with data.
pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    with_status(StatusCode::CREATED, Some(data), message)
}

/// 200 envelope without data.
pub fn ok_message(message: &str) -> Response {
    with_status::<()>(StatusCode::OK, None, message)
}

pub fn with_status<T: Serialize>(status: StatusCode, data: Option<T>, message: &str) -> Response {
    let body = Envelope {
        success: true,
        message: message.to_string(),
        data,
        errors: None,
        error_code: None,
        meta: Meta::now(status),
    };
    (status, Json(body)).into_response()
}

/// Failure envelope. Used by `AppError::into_response`; handlers normally
/// return `AppError` instead of calling this directly.
pub fn failure(
    status: StatusCode,
    message: &str,
    error_code: &str,
    errors: Option<serde_json::Value>,
) -> Response {
    let body = Envelope::<()> {
        success: false,
        message: message.to_string(),
        data: None,
        errors,
        error_code: Some(error_code.to_string()),
        meta: Meta::now(status),
    };
    (status, Json(body)).into_response()
}
