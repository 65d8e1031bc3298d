//! The caller's own profile. Admin tokens resolve against the admin table.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::validate;
use crate::auth::{hash_password, verify_password, AuthUser, Claims};
use crate::domain::aggregates::ProfileUpdate;
use crate::error::{ApiError, Result};
use crate::repository::{admins, users};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route("/change-password", put(change_password))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// Serialises an account and stamps the role the caller's token carries.
fn with_role<T: Serialize>(account: &T, claims: &Claims) -> Result<Value> {
    let mut value = serde_json::to_value(account).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Some(map) = value.as_object_mut() {
        map.insert("role".into(), json!(claims.role));
    }
    Ok(value)
}

async fn profile(AuthUser(claims): AuthUser, State(state): State<AppState>) -> Result<Json<Value>> {
    let user = if claims.is_admin() {
        let admin = admins::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
        with_role(&admin, &claims)?
    } else {
        let user = users::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
        with_role(&user, &claims)?
    };
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn update_profile(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>> {
    let user = if claims.is_admin() {
        let mut admin = admins::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
            admin.rename(name);
        }
        admins::update(&state.db, &admin).await?;
        with_role(&admin, &claims)?
    } else {
        let mut user = users::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
        user.apply_profile(update);
        users::update(&state.db, &mut user).await?;
        with_role(&user, &claims)?
    };
    info!(account_id = %claims.sub, "profile updated");
    Ok(Json(json!({ "success": true, "message": "Profile updated successfully", "user": user })))
}

async fn change_password(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    validate(&body)?;
    let wrong = || ApiError::BadRequest("Current password is incorrect".into());
    if claims.is_admin() {
        let mut admin = admins::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
        if !verify_password(body.current_password, admin.password_hash.clone()).await {
            return Err(wrong());
        }
        admin.set_password_hash(hash_password(body.new_password).await?);
        admins::update(&state.db, &admin).await?;
    } else {
        let mut user = users::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
        if !verify_password(body.current_password, user.password_hash.clone()).await {
            return Err(wrong());
        }
        user.set_password_hash(hash_password(body.new_password).await?);
        users::update(&state.db, &mut user).await?;
    }
    info!(account_id = %claims.sub, "password changed");
    Ok(super::ok_message("Password updated successfully"))
}
