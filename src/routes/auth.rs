//! Registration and login.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use super::{client_info, validate};
use crate::auth::{hash_password, verify_password, AuthError, Role};
use crate::domain::aggregates::user::normalize_email;
use crate::domain::aggregates::{Admin, StoreDetails, User};
use crate::error::Result;
use crate::repository::{admins, users};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/vendor/register", post(register_vendor))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VendorRegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Store name is required"))]
    pub store_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

fn user_body(user: &User) -> Value {
    json!({
        "id": user.id,
        "publicId": user.public_id,
        "name": user.name,
        "email": user.email,
        "role": Role::from(user.role),
        "storeName": user.store_name,
    })
}

async fn register(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> Result<Json<Value>> {
    validate(&body)?;
    let hash = hash_password(body.password).await?;
    let mut user = User::customer(body.name.trim(), body.email, hash);
    users::insert(&state.db, &mut user).await?;
    let token = state.tokens.issue(user.id, user.role.into(), vec![])?;
    info!(user_id = %user.id, "user registered");
    Ok(Json(json!({ "success": true, "token": token, "user": user_body(&user) })))
}

async fn register_vendor(
    State(state): State<AppState>,
    Json(body): Json<VendorRegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    validate(&body)?;
    let hash = hash_password(body.password).await?;
    let store = StoreDetails {
        store_name: Some(body.store_name),
        phone_number: body.phone_number,
        address: body.address,
        description: body.description,
        logo: body.logo,
    };
    let mut vendor = User::vendor(body.name.trim(), body.email, hash, store);
    users::insert(&state.db, &mut vendor).await?;
    let token = state.tokens.issue(vendor.id, vendor.role.into(), vec![])?;
    info!(vendor_id = %vendor.id, "vendor registered");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "token": token, "user": user_body(&vendor) }))))
}

/// Checks the password and records the login. Inactive admins are refused.
async fn admin_sign_in(state: &AppState, mut admin: Admin, password: String, headers: &HeaderMap) -> Result<Admin> {
    if !verify_password(password, admin.password_hash.clone()).await {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !admin.is_active() {
        warn!(admin_id = %admin.id, status = ?admin.status, "inactive admin attempted login");
        return Err(AuthError::Forbidden.into());
    }
    let (ip, agent) = client_info(headers);
    admin.record_login(ip, agent);
    admins::update(&state.db, &admin).await?;
    Ok(admin)
}

/// Admins are looked up first; they sign in with the plain `admin` role here.
async fn login(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<LoginRequest>) -> Result<Json<Value>> {
    validate(&body)?;
    let email = normalize_email(&body.email);

    if let Some(admin) = admins::find_by_email(&state.db, &email).await? {
        let admin = admin_sign_in(&state, admin, body.password, &headers).await?;
        let token = state.tokens.issue(admin.id, Role::Admin, admin.permissions.clone())?;
        info!(admin_id = %admin.id, "admin logged in");
        return Ok(Json(json!({
            "success": true,
            "token": token,
            "user": {
                "id": admin.id,
                "name": admin.name,
                "email": admin.email,
                "role": Role::Admin,
                "permissions": admin.permissions,
            },
        })));
    }

    let user = users::find_by_email(&state.db, &email).await?.ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(body.password, user.password_hash.clone()).await {
        return Err(AuthError::InvalidCredentials.into());
    }
    let token = state.tokens.issue(user.id, user.role.into(), vec![])?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(json!({ "success": true, "token": token, "user": user_body(&user) })))
}

async fn admin_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    validate(&body)?;
    let admin = admins::find_by_email(&state.db, &normalize_email(&body.email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    let admin = admin_sign_in(&state, admin, body.password, &headers).await?;
    let role = Role::from(admin.role);
    let token = state.tokens.issue(admin.id, role, admin.permissions.clone())?;
    info!(admin_id = %admin.id, ?role, "admin logged in");
    Ok(Json(json!({
        "success": true,
        "token": token,
        "admin": {
            "id": admin.id,
            "publicId": admin.public_id,
            "name": admin.name,
            "email": admin.email,
            "role": role,
            "permissions": admin.permissions,
            "lastLogin": admin.last_login,
        },
    })))
}

/// Creates the configured super admin unless an admin with that email exists.
pub async fn ensure_bootstrap_admin(state: &AppState) -> Result<()> {
    let Some(bootstrap) = state.config.bootstrap_admin.clone() else { return Ok(()) };
    let email = normalize_email(&bootstrap.email);
    if admins::find_by_email(&state.db, &email).await?.is_some() {
        return Ok(());
    }
    let hash = hash_password(bootstrap.password.expose_secret().to_owned()).await?;
    let mut admin = Admin::super_admin("Super Admin", &email, hash);
    admins::insert(&state.db, &mut admin).await?;
    info!(admin_id = %admin.id, %email, "bootstrap super admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest { name: "Ada".into(), email: "ada@example.com".into(), password: "secret1".into() };
        assert!(ok.validate().is_ok());
        let bad = RegisterRequest { name: "".into(), email: "nope".into(), password: "123".into() };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_vendor_request_uses_camel_case() {
        let body: VendorRegisterRequest = serde_json::from_str(
            r#"{"name":"Bo","email":"bo@shop.io","password":"secret1","storeName":"Bo's","phoneNumber":"555"}"#,
        )
        .unwrap();
        assert_eq!(body.store_name, "Bo's");
        assert_eq!(body.phone_number.as_deref(), Some("555"));
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_user_body_hides_password() {
        let user = User::customer("Ada", "ADA@example.com ", "hash".into());
        let body = user_body(&user);
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["role"], "user");
        assert!(body.get("passwordHash").is_none());
    }
}
