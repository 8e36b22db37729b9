use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::{error::AppError, response};
use validator::Validate;

/// JSON extractor that runs `validator` rules before the handler sees the
/// payload. Rejections use the standard failure envelope.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            response::failure(
                StatusCode::BAD_REQUEST,
                &format!("Json parse error: {}", e),
                "BAD_REQUEST",
                None,
            )
        })?;

        value
            .validate()
            .map_err(|e| AppError::Validation(e).into_response())?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use validator::Validate;

    #[derive(serde::Deserialize, Validate)]
    struct Probe {
        #[validate(email(message = "Invalid email format"))]
        email: String,
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_with_envelope() {
        let req = Request::builder()
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"email": "not-an-email"}"#))
            .unwrap();

        let result = ValidatedJson::<Probe>::from_request(req, &()).await;
        let response = match result {
            Err(resp) => resp,
            Ok(_) => panic!("expected rejection"),
        };
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn valid_payload_passes() {
        let req = Request::builder()
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"email": "a@x.com"}"#))
            .unwrap();

        let result = ValidatedJson::<Probe>::from_request(req, &()).await;
        assert!(result.is_ok());
    }

    #[test]
    fn app_error_conversion_keeps_422() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("email", validator::ValidationError::new("email"));
        let response = AppError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
