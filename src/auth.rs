//! Bearer-token authentication and password hashing.
//!
//! Tokens are HS256 JWTs signed with the configured secret and valid for 24
//! hours. [`AuthUser`] rejects a request with 401 when the token is missing
//! or invalid; [`AdminUser`] additionally rejects non-admin claims with 403.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::{AdminRole, Permission, UserRole};
use crate::error::ApiError;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role { User, Vendor, Admin, SuperAdmin }

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::User => Self::User,
            UserRole::Vendor => Self::Vendor,
        }
    }
}

impl From<AdminRole> for Role {
    fn from(role: AdminRole) -> Self {
        match role {
            AdminRole::Admin => Self::Admin,
            AdminRole::SuperAdmin => Self::SuperAdmin,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool { matches!(self.role, Role::Admin | Role::SuperAdmin) }
    pub fn is_vendor(&self) -> bool { self.role == Role::Vendor }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role == Role::SuperAdmin || self.permissions.contains(&permission)
    }

    /// 403 unless the caller holds `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has_permission(permission) { Ok(()) } else { Err(AuthError::Forbidden) }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token, authorization denied")]
    MissingToken,
    #[error("Token is not valid")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("Access denied")]
    Forbidden,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    inner: Arc<KeysInner>,
}

struct KeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            inner: Arc::new(KeysInner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
            }),
        }
    }

    pub fn issue(&self, sub: Uuid, role: Role, permissions: Vec<Permission>) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub, role, permissions,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.inner.decoding, &self.inner.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::InvalidToken(e)
        })?;
        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("TokenKeys([REDACTED])") }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Claims of an authenticated caller.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = TokenKeys::from_ref(state).verify(token)?;
        Ok(Self(claims))
    }
}

/// Claims of an authenticated admin or super admin.
#[derive(Clone, Debug)]
pub struct AdminUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AuthError::Forbidden.into());
        }
        Ok(Self(claims))
    }
}

/// Runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&hash)
            .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_issue_then_verify() {
        let keys = TokenKeys::new("test-secret");
        let id = Uuid::now_v7();
        let token = keys.issue(id, Role::Admin, vec![Permission::ViewAnalytics]).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.is_admin());
        assert!(claims.has_permission(Permission::ViewAnalytics));
        assert!(claims.require(Permission::ManageUsers).is_err());
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenKeys::new("one").issue(Uuid::now_v7(), Role::User, vec![]).unwrap();
        assert!(matches!(TokenKeys::new("two").verify(&token), Err(AuthError::InvalidToken(_))));
        assert!(TokenKeys::new("one").verify("not-a-token").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = TokenKeys::new("s");
        let claims = Claims { sub: Uuid::now_v7(), role: Role::User, permissions: vec![], iat: 0, exp: 1 };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"s")).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_super_admin_has_every_permission() {
        let claims = Claims { sub: Uuid::now_v7(), role: Role::SuperAdmin, permissions: vec![], iat: 0, exp: 0 };
        assert!(Permission::ALL.iter().all(|p| claims.has_permission(*p)));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn test_password_hashing() {
        let hash = hash_password("hunter22".into()).await.unwrap();
        assert!(verify_password("hunter22".into(), hash.clone()).await);
        assert!(!verify_password("wrong".into(), hash).await);
        assert!(!verify_password("x".into(), "not-a-hash".into()).await);
    }
}
