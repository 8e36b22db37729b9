use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::User;

/// Why a token failed to decode. `Missing` is produced by the request gate,
/// not here; the two kinds below must never collapse into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

/// Signed claims carried by every bearer token. `role` is the legacy cached
/// label; authorization always re-queries the grant relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Legacy role label at issuance time
    pub role: Option<String>,
    /// Account status at issuance time
    pub status: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (deny-list key)
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }

    /// Seconds until natural expiry; non-positive once expired.
    pub fn remaining_seconds(&self) -> i64 {
        self.exp - Utc::now().timestamp()
    }
}

/// Token payload returned to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// HS256 token service bound to the server secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
    refresh_ttl_minutes: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl_minutes: config.ttl_minutes,
            refresh_ttl_minutes: config.refresh_ttl_minutes,
        }
    }

    /// Issue a bearer token for a user.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.ttl_minutes);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role_label.clone(),
            status: user.status.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))?;

        Ok(IssuedToken {
            token,
            token_type: "bearer".to_string(),
            expires_in: self.expires_in_seconds(),
        })
    }

    /// Validate and decode a token. Expired and tampered/malformed tokens
    /// return distinct kinds.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }

    /// Decode for refresh: the signature must verify, but expiry is accepted
    /// within the refresh window measured from issuance.
    pub fn decode_for_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        let refresh_deadline = claims.iat + self.refresh_ttl_minutes * 60;
        if Utc::now().timestamp() > refresh_deadline {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Client-facing token lifetime in seconds.
    pub fn expires_in_seconds(&self) -> i64 {
        self.ttl_minutes * 60
    }

    /// Seconds until the claims fall out of the refresh window; non-positive
    /// once refresh is no longer possible.
    pub fn refresh_remaining_seconds(&self, claims: &Claims) -> i64 {
        claims.iat + self.refresh_ttl_minutes * 60 - Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service(ttl_minutes: i64, refresh_ttl_minutes: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "unit-test-secret-0123456789abcdef".to_string(),
            ttl_minutes,
            refresh_ttl_minutes,
        })
    }

    fn test_user() -> User {
        let mut user = User::new(
            "Test User".to_string(),
            "test@example.com".to_string(),
            "$argon2id$hash".to_string(),
            None,
        );
        user.role_label = Some("admin".to_string());
        user
    }

    /// Encode claims directly, bypassing `issue`, to control timestamps.
    fn encode_raw(service_secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(service_secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issue_then_validate_roundtrip() {
        let service = test_service(60, 20160);
        let user = test_user();

        let issued = service.issue(&user).unwrap();
        assert_eq!(issued.token_type, "bearer");
        assert_eq!(issued.expires_in, 3600);

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.status, "active");
        assert_eq!(claims.user_id().unwrap(), user.id);
    }

    #[test]
    fn expired_token_reports_expired_not_invalid() {
        let service = test_service(60, 20160);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: None,
            status: "active".to_string(),
            exp: now - 120,
            iat: now - 3720,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_raw("unit-test-secret-0123456789abcdef", &claims);

        assert_eq!(service.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_reports_invalid() {
        let service = test_service(60, 20160);
        let issued = service.issue(&test_user()).unwrap();

        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert_eq!(service.validate(&tampered), Err(TokenError::Invalid));

        let wrong_key = encode_raw(
            "a-different-secret-0123456789abcdef",
            &Claims {
                sub: Uuid::new_v4().to_string(),
                role: None,
                status: "active".to_string(),
                exp: Utc::now().timestamp() + 3600,
                iat: Utc::now().timestamp(),
                jti: Uuid::new_v4().to_string(),
            },
        );
        assert_eq!(service.validate(&wrong_key), Err(TokenError::Invalid));
    }

    #[test]
    fn refresh_accepts_expired_token_inside_window() {
        let service = test_service(60, 20160);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: None,
            status: "active".to_string(),
            exp: now - 600,
            iat: now - 4200,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_raw("unit-test-secret-0123456789abcdef", &claims);

        assert_eq!(service.validate(&token), Err(TokenError::Expired));
        let refreshed = service.decode_for_refresh(&token).unwrap();
        assert_eq!(refreshed.sub, claims.sub);
    }

    #[test]
    fn refresh_rejects_token_beyond_window() {
        // Refresh window of one minute; token issued an hour ago.
        let service = test_service(1, 1);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: None,
            status: "active".to_string(),
            exp: now - 3540,
            iat: now - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_raw("unit-test-secret-0123456789abcdef", &claims);

        assert_eq!(service.decode_for_refresh(&token), Err(TokenError::Expired));
    }

    #[test]
    fn refresh_still_requires_a_valid_signature() {
        let service = test_service(60, 20160);
        assert_eq!(
            service.decode_for_refresh("not.a.token"),
            Err(TokenError::Invalid)
        );
    }
}
