//! Back-office endpoints. Every handler requires admin claims.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ok_message, validate};
use crate::auth::{hash_password, AdminUser};
use crate::domain::aggregates::{AccountUpdate, Permission, StoreDetails, User, UserRole};
use crate::error::{ApiError, Result};
use crate::repository::{orders, products, users};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
    pub store_name: Option<String>,
}

async fn stats(AdminUser(claims): AdminUser, State(state): State<AppState>) -> Result<Json<Value>> {
    claims.require(Permission::ViewAnalytics)?;
    let (users, vendors, products, orders, revenue) = tokio::try_join!(
        users::count_by_role(&state.db, UserRole::User),
        users::count_by_role(&state.db, UserRole::Vendor),
        products::count(&state.db),
        orders::count(&state.db),
        orders::total_revenue(&state.db),
    )?;
    Ok(Json(json!({
        "success": true,
        "stats": {
            "totalUsers": users,
            "totalVendors": vendors,
            "totalProducts": products,
            "totalOrders": orders,
            "totalRevenue": revenue,
        },
    })))
}

async fn list_users(AdminUser(claims): AdminUser, State(state): State<AppState>) -> Result<Json<Value>> {
    claims.require(Permission::ManageUsers)?;
    let users = users::list(&state.db).await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

async fn create_user(
    AdminUser(claims): AdminUser,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    claims.require(Permission::ManageUsers)?;
    validate(&body)?;
    let hash = hash_password(body.password).await?;
    let mut user = match body.role {
        UserRole::Vendor => {
            let store = StoreDetails { store_name: body.store_name, ..Default::default() };
            User::vendor(body.name.trim(), body.email, hash, store)
        }
        UserRole::User => User::customer(body.name.trim(), body.email, hash),
    };
    users::insert(&state.db, &mut user).await?;
    info!(admin_id = %claims.sub, user_id = %user.id, "user created by admin");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "user": user }))))
}

async fn update_user(
    AdminUser(claims): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<Value>> {
    claims.require(Permission::ManageUsers)?;
    let mut user = users::find(&state.db, id).await?.ok_or(ApiError::NotFound("User not found"))?;
    user.apply_account_update(update);
    users::update(&state.db, &mut user).await?;
    info!(admin_id = %claims.sub, user_id = %id, "user updated by admin");
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn delete_user(
    AdminUser(claims): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    claims.require(Permission::ManageUsers)?;
    if !users::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found"));
    }
    info!(admin_id = %claims.sub, user_id = %id, "user deleted by admin");
    Ok(ok_message("User deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_defaults_to_customer() {
        let body: CreateUserRequest =
            serde_json::from_str(r#"{"name":"Cy","email":"cy@example.com","password":"secret1"}"#).unwrap();
        assert_eq!(body.role, UserRole::User);
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_create_vendor_with_store() {
        let body: CreateUserRequest = serde_json::from_str(
            r#"{"name":"Cy","email":"cy@example.com","password":"secret1","role":"vendor","storeName":"Cy Co"}"#,
        )
        .unwrap();
        assert_eq!(body.role, UserRole::Vendor);
        assert_eq!(body.store_name.as_deref(), Some("Cy Co"));
    }
}
