//! Authentication and authorization
//!
//! Tokens are HS256 JWTs carrying the user, the cabinet (tenant) the user
//! works for and the user's roles. Every protected handler scopes its reads
//! and writes to the token's cabinet.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::{CabinetId, OperationMetadata};

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Cabinet the user belongs to
    pub cabinet: Uuid,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
    /// `x-request-id` of the request that carried the token
    #[serde(skip)]
    pub request_id: Option<String>,
}

impl Claims {
    pub fn cabinet_id(&self) -> CabinetId {
        CabinetId::from(self.cabinet)
    }

    /// Fails with 403 unless the user holds `permission` (or is admin)
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if has_role(self, permission) {
            Ok(())
        } else {
            Err(AuthError::MissingPermission(permission.to_string()).into())
        }
    }

    /// Operation metadata attributing a port call to this user and request
    pub fn metadata(&self) -> OperationMetadata {
        let metadata = match &self.request_id {
            Some(id) => OperationMetadata::with_correlation_id(id.clone()),
            None => OperationMetadata::default(),
        };
        OperationMetadata {
            initiated_by: Some(self.sub.clone()),
            ..metadata
        }
        .with_context("cabinet", self.cabinet.to_string())
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `cabinet_id` - Tenant the user works for
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    cabinet_id: CabinetId,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        cabinet: cabinet_id.into(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
        request_id: None,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == roles::ADMIN)
}

pub mod roles {
    pub const ADMIN: &str = "admin";
}

/// Permission definitions
pub mod permissions {
    pub const CLIENT_READ: &str = "client:read";
    pub const CLIENT_WRITE: &str = "client:write";
    /// Soft and permanent deletes
    pub const CLIENT_DELETE: &str = "client:delete";
    pub const BILLING_READ: &str = "billing:read";
    pub const BILLING_WRITE: &str = "billing:write";
    pub const REPORT_READ: &str = "report:read";
    pub const REMINDER_SEND: &str = "reminder:send";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_roundtrip() {
        let cabinet = CabinetId::new();
        let token = create_token("user-1", cabinet, vec![permissions::CLIENT_READ.into()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.cabinet_id(), cabinet);
        assert!(claims.require(permissions::CLIENT_READ).is_ok());
        assert!(claims.require(permissions::CLIENT_DELETE).is_err());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token("user-1", CabinetId::new(), vec![], SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            cabinet: Uuid::new_v4(),
            roles: vec![],
            exp: now - 3600,
            iat: now - 7200,
            request_id: None,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_admin_has_every_permission() {
        let claims = Claims {
            sub: "root".into(),
            cabinet: Uuid::new_v4(),
            roles: vec![roles::ADMIN.into()],
            exp: 0,
            iat: 0,
            request_id: None,
        };
        assert!(claims.require(permissions::CLIENT_DELETE).is_ok());
        assert_eq!(claims.metadata().initiated_by.as_deref(), Some("root"));
        assert_eq!(claims.metadata().correlation_id, None);
    }

    #[test]
    fn test_metadata_carries_request_id() {
        let token = create_token("user-7", CabinetId::new(), vec![], SECRET, 60).unwrap();
        let mut claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.request_id, None);

        claims.request_id = Some("req-42".into());
        let metadata = claims.metadata();
        assert_eq!(metadata.correlation_id.as_deref(), Some("req-42"));
        assert_eq!(metadata.initiated_by.as_deref(), Some("user-7"));
        assert_eq!(metadata.context.get("cabinet"), Some(&claims.cabinet.to_string()));
    }
}
