//! Session orchestrator: login, logout, refresh, identity resolution and
//! the password-reset flow.
//!
//! Per-principal lifecycle: Anonymous -> Authenticating -> Authenticated ->
//! (LoggedOut | SessionReplaced) -> Anonymous. Sessions repeat; there is no
//! terminal state.

use rand::Rng;
use std::sync::Arc;

use crate::{
    dtos::auth::{AuthPayload, LoginRequest, RegisterRequest},
    models::{LoginContext, PasswordResetToken, User},
    services::{Claims, Database, JwtService, ServiceError, TokenDenyList},
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: JwtService,
    deny_list: Arc<dyn TokenDenyList>,
    /// Close any open ledger entry for the user on each new login.
    single_session: bool,
    reset_token_ttl_minutes: i64,
}

impl AuthService {
    pub fn new(
        db: Database,
        jwt: JwtService,
        deny_list: Arc<dyn TokenDenyList>,
        single_session: bool,
        reset_token_ttl_minutes: i64,
    ) -> Self {
        Self {
            db,
            jwt,
            deny_list,
            single_session,
            reset_token_ttl_minutes,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthPayload, ServiceError> {
        if self.db.email_exists(&req.email).await? {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&Password::new(req.password))
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        let user = User::new(req.name, req.email, password_hash.into_string(), req.phone);

        // A concurrent registration can still slip past the existence check;
        // the unique index is the arbiter.
        self.db.insert_user(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::EmailAlreadyRegistered
            } else {
                ServiceError::Database(e)
            }
        })?;

        tracing::info!(user_id = %user.id, "User registered");

        let issued = self.jwt.issue(&user)?;
        Ok(AuthPayload::new(user.sanitized(), issued))
    }

    /// Authenticate credentials and open a session. Unknown email, wrong
    /// password and non-active account all fail identically so callers
    /// cannot probe for account existence.
    pub async fn login(
        &self,
        req: LoginRequest,
        context: LoginContext,
    ) -> Result<AuthPayload, ServiceError> {
        let user = self
            .db
            .find_user_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        if !user.is_active() {
            return Err(ServiceError::InvalidCredentials);
        }

        self.db.update_last_login(user.id).await?;

        // Close-before-open: prior open entries are closed in the same
        // transaction that appends the new one.
        let login_data = serde_json::to_value(&context)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Login context encode: {}", e)))?;
        self.db
            .record_login(user.id, &login_data, self.single_session)
            .await?;

        tracing::info!(user_id = %user.id, ip = %context.ip_address, "User logged in");

        let issued = self.jwt.issue(&user)?;
        Ok(AuthPayload::new(user.sanitized(), issued))
    }

    /// Close the current session. Reports success even when no open ledger
    /// entry exists; a deny-list failure downgrades to a warning so logout
    /// is never blocked on the cache.
    pub async fn logout(&self, claims: &Claims) -> Result<bool, ServiceError> {
        let user_id = claims.user_id().map_err(|_| ServiceError::TokenInvalid)?;

        if let Some(open_log) = self.db.find_latest_open_log(user_id).await? {
            self.db.close_log(open_log.id).await?;
        }

        let remaining = claims.remaining_seconds();
        if remaining > 0 {
            if let Err(e) = self.deny_list.revoke(&claims.jti, remaining).await {
                tracing::warn!(user_id = %user_id, error = %e, "Logout could not be confirmed on deny-list");
            }
        }

        tracing::info!(user_id = %user_id, "User logged out");
        Ok(true)
    }

    /// Exchange a token for a fresh one. The old token must carry a valid
    /// signature and sit inside the refresh window; it is revoked once the
    /// new one is issued.
    pub async fn refresh(&self, token: &str) -> Result<AuthPayload, ServiceError> {
        let claims = self
            .jwt
            .decode_for_refresh(token)
            .map_err(ServiceError::from)?;

        if self
            .deny_list
            .is_revoked(&claims.jti)
            .await
            .map_err(ServiceError::DenyList)?
        {
            return Err(ServiceError::TokenRevoked);
        }

        let user_id = claims.user_id().map_err(|_| ServiceError::TokenInvalid)?;
        let user = self
            .db
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::TokenInvalid)?;

        if !user.is_active() {
            return Err(ServiceError::UserInactive);
        }

        let issued = self.jwt.issue(&user)?;

        // Keep the old jti denied for as long as it could still be used:
        // until the later of natural expiry and refresh-window end.
        let deny_for = claims
            .remaining_seconds()
            .max(self.jwt.refresh_remaining_seconds(&claims))
            .max(60);
        self.deny_list
            .revoke(&claims.jti, deny_for)
            .await
            .map_err(ServiceError::DenyList)?;

        tracing::info!(user_id = %user.id, "Token refreshed");
        Ok(AuthPayload::new(user.sanitized(), issued))
    }

    /// Resolve the principal behind a token without side effects. Any
    /// failure resolves to None; callers needing the failure kind go
    /// through the request gate instead.
    pub async fn current_user(&self, token: &str) -> Option<User> {
        let claims = self.jwt.validate(token).ok()?;
        match self.deny_list.is_revoked(&claims.jti).await {
            Ok(false) => {}
            _ => return None,
        }

        let user_id = claims.user_id().ok()?;
        let user = self.db.find_user_by_id(user_id).await.ok()??;
        user.is_active().then_some(user)
    }

    /// Issue a single-use reset token. Returns false when no account holds
    /// the email; the caller decides how much of that to reveal.
    pub async fn forgot_password(&self, email: &str) -> Result<bool, ServiceError> {
        let Some(user) = self.db.find_user_by_email(email).await? else {
            return Ok(false);
        };

        let token = generate_reset_token();
        let record = PasswordResetToken::new(user.id, &token, self.reset_token_ttl_minutes);
        self.db.insert_reset_token(&record).await?;

        // Delivery is out of scope here; downstream tooling picks the event
        // up from the log. The token value itself is never logged.
        tracing::info!(user_id = %user.id, expires_at = %record.expires_at, "Password reset token issued");
        Ok(true)
    }

    /// Redeem a reset token: must be unexpired and unused, and is consumed
    /// together with the credential rewrite.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<bool, ServiceError> {
        let record = self
            .db
            .find_active_reset_token(&PasswordResetToken::hash_token(token))
            .await?
            .ok_or(ServiceError::ResetTokenInvalid)?;

        let password_hash = hash_password(&Password::new(password.to_string()))
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        self.db
            .consume_reset_token(record.id, record.user_id, password_hash.as_str())
            .await?;

        tracing::info!(user_id = %record.user_id, "Password reset");
        Ok(true)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn generate_reset_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}
