//! Request gate: token extraction, validation, deny-list check and
//! principal loading. Short-circuits before any handler runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::{AppError, TokenFailure};

use crate::{
    models::User,
    services::{Claims, TokenError},
    AppState,
};

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or(AppError::Unauthenticated(TokenFailure::Missing))?
        .to_string();

    let claims = state.jwt.validate(&token).map_err(|e| match e {
        TokenError::Expired => AppError::Unauthenticated(TokenFailure::Expired),
        TokenError::Invalid => AppError::Unauthenticated(TokenFailure::Invalid),
    })?;

    // Fail closed: if the deny-list store is unreachable we reject rather
    // than accept a possibly revoked token.
    let revoked = state.deny_list.is_revoked(&claims.jti).await.map_err(|e| {
        tracing::error!(error = %e, "Deny-list check failed");
        AppError::Storage(e)
    })?;

    if revoked {
        return Err(AppError::Unauthenticated(TokenFailure::Revoked));
    }

    let user_id = claims
        .user_id()
        .map_err(|_| AppError::Unauthenticated(TokenFailure::Invalid))?;

    let user = state
        .db
        .find_user_by_id(user_id)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::Unauthenticated(TokenFailure::Invalid))?;

    if !user.is_active() {
        return Err(AppError::Inactive);
    }

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extractor for the principal resolved by the gate.
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Authenticated principal missing from request extensions"
            ))
        })?;
        let claims = parts.extensions.get::<Claims>().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser { user, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }
}
