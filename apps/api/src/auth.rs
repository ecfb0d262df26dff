//! JWT authentication module.
//!
//! Handles token issuance and validation, password hashing, and the
//! [`CurrentUser`] extractor every protected handler takes.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! CurrentUser::from_request_parts
//!        │  missing / malformed / expired → 401 UNAUTHORIZED
//!        ▼
//! Claims { sub, owner, role, permissions } ──► Principal
//!        │
//!        ▼
//! handler: user.require(Permission::SalesManage)?  → 403 FORBIDDEN
//!          user.owner_id() scopes every query
//! ```

use std::ops::Deref;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use cafe_core::{Permission, Principal, Role, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const TOKEN_TYPE_ACCESS: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Owner id the user's data is scoped by (equals `sub` for owners)
    pub owner: String,

    pub role: Role,

    /// Explicitly assigned permissions
    pub permissions: Vec<Permission>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type, always "access"
    pub token_type: String,
}

impl Claims {
    /// Rebuilds the principal the token was issued for.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.sub.clone(),
            owner_id: (self.owner != self.sub).then(|| self.owner.clone()),
            role: self.role,
            permissions: self.permissions.clone(),
        }
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issues an access token for `user`.
    pub fn generate_access_token(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);
        let principal = user.principal();

        let claims = Claims {
            sub: user.id.clone(),
            owner: principal.owner_id().to_string(),
            role: user.role,
            permissions: user.permissions.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!(error = %e, "Rejected bearer token");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::unauthorized("Token expired")
                }
                _ => ApiError::unauthorized("Invalid token"),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> ApiResult<Claims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(ApiError::unauthorized("Expected access token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated principal of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl CurrentUser {
    /// Fails with 403 unless the principal holds `permission`.
    pub fn require(&self, permission: Permission) -> ApiResult<()> {
        if self.0.has_permission(permission) {
            Ok(())
        } else {
            warn!(user = %self.0.id, %permission, "Permission denied");
            Err(ApiError::forbidden(format!("Missing permission: {}", permission)))
        }
    }
}

impl Deref for CurrentUser {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.0
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

        let claims = state.jwt.validate_access_token(token)?;
        let user = CurrentUser(claims.principal());
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}
