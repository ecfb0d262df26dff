//! Staff accounts.
//!
//! An owner (or anyone holding `users:manage`) creates accounts under their
//! own owner id. Only staff, editor and content admin roles may be handed out.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use cafe_core::validation::{validate_email, validate_password, validate_text};
use cafe_core::{Permission, Role, ValidationError, ValidationErrors};
use cafe_db::NewUser;
use serde::Deserialize;
use tracing::info;

use crate::auth::{hash_password, CurrentUser};
use crate::error::ApiResult;
use crate::response::{created, ok, ApiJson};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users", get(list).post(create))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_text("name", &self.name, 1, 100));
        errors.check(validate_email(&self.email));
        errors.check(validate_password(&self.password));

        if !self.role.is_assignable_by_owner() {
            errors.push(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL
                    .iter()
                    .filter(|r| r.is_assignable_by_owner())
                    .map(|r| r.to_string())
                    .collect(),
            });
        }
        errors.into_result()
    }
}

/// POST /api/users
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(Permission::UsersManage)?;
    req.validate()?;

    let mut permissions = req.permissions;
    permissions.sort_by_key(|p| p.as_str());
    permissions.dedup();

    let account = state
        .db
        .users()
        .insert(NewUser {
            owner_id: Some(user.owner_id().to_string()),
            name: req.name.trim().to_string(),
            email: req.email,
            password_hash: hash_password(&req.password)?,
            role: req.role,
            permissions,
        })
        .await?;

    info!(
        user_id = %account.id,
        owner_id = %user.owner_id(),
        role = %account.role,
        "Created account"
    );
    Ok(created("User created", account))
}

/// GET /api/users
async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<impl IntoResponse> {
    user.require(Permission::UsersManage)?;
    let users = state.db.users().list_by_owner(user.owner_id()).await?;
    Ok(ok(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Role) -> CreateUserRequest {
        CreateUserRequest {
            name: "Barista".to_string(),
            email: "barista@example.com".to_string(),
            password: "long-enough".to_string(),
            role,
            permissions: vec![Permission::SalesManage],
        }
    }

    #[test]
    fn test_assignable_roles() {
        assert!(request(Role::Staff).validate().is_ok());
        assert!(request(Role::Editor).validate().is_ok());
        assert!(request(Role::ContentAdmin).validate().is_ok());

        for role in [Role::SuperAdmin, Role::Admin, Role::CafeOwner, Role::Customer] {
            let errors = request(role).validate().unwrap_err();
            assert_eq!(errors.iter().next().unwrap().field(), "role");
        }
    }
}
