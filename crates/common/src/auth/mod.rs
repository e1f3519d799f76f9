//! Authentication utilities
//!
//! Provides:
//! - JWT token generation and validation
//! - User context extraction for handlers
//!
//! Session management itself lives outside this service; the gateway only
//! validates bearer tokens and passes the resolved user identity down as an
//! explicit parameter. Nothing below the handler layer reads ambient auth
//! state.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthorized {
                    message: "Invalid bearer token".to_string(),
                },
            })
    }
}

/// Extract a bearer token from an Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for AuthContext
///
/// The JWT secret is looked up through the `JwtSecretProvider` implemented by
/// the gateway's application state.
impl<S> FromRequestParts<S> for AuthContext
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Malformed Authorization header".to_string(),
        })?;

        let claims = state.jwt_manager().validate_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized {
            message: "Invalid subject in token".to_string(),
        })?;

        Ok(AuthContext {
            user_id,
            request_id,
        })
    }
}

/// Access to the JWT manager from shared application state
pub trait JwtSecretProvider {
    fn jwt_manager(&self) -> &JwtManager;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let manager = JwtManager::new("test-secret", 3600);
        let user_id = Uuid::new_v4();

        let token = manager.generate_token(user_id).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = JwtManager::new("secret-a", 3600);
        let other = JwtManager::new("secret-b", 3600);

        let token = manager.generate_token(Uuid::new_v4()).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
    }
}
