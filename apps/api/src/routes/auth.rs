//! Authentication handlers.
//!
//! Registration creates a cafe owner. Login answers every mismatch with the
//! same message so accounts cannot be enumerated.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cafe_core::validation::{validate_email, validate_password, validate_text};
use cafe_core::{Role, User, ValidationErrors};
use cafe_db::NewUser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, with_message, ApiJson};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_text("name", &self.name, 1, 100));
        errors.check(validate_email(&self.email));
        errors.check(validate_password(&self.password));
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl AuthResponse {
    fn issue(state: &AppState, user: User) -> ApiResult<Self> {
        let token = state.jwt.generate_access_token(&user)?;
        Ok(AuthResponse {
            user,
            token,
            token_type: "Bearer",
            expires_in: state.jwt.lifetime_secs(),
        })
    }
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = state
        .db
        .users()
        .insert(NewUser {
            owner_id: None,
            name: req.name.trim().to_string(),
            email: req.email,
            password_hash: hash_password(&req.password)?,
            role: Role::CafeOwner,
            permissions: Vec::new(),
        })
        .await?;

    info!(user_id = %user.id, "Registered cafe owner");
    Ok(created("Registered", AuthResponse::issue(&state, user)?))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let credentials = state.db.users().find_credentials(&req.email).await?;

    let user = match credentials {
        Some((user, hash)) if user.is_active && verify_password(&req.password, &hash) => user,
        Some((user, _)) => {
            warn!(user_id = %user.id, active = user.is_active, "Login failed");
            return Err(ApiError::invalid_credentials());
        }
        None => {
            warn!("Login failed - unknown email");
            return Err(ApiError::invalid_credentials());
        }
    };

    info!(user_id = %user.id, role = %user.role, "Logged in");
    Ok(with_message("Logged in", AuthResponse::issue(&state, user)?))
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let account = state.db.users().find(&user.id).await?;
    Ok(ok(account))
}
