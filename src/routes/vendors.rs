//! Vendor directory.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::repository::users;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list)).route("/profile", get(profile))
}

#[derive(Debug, Default, Deserialize)]
pub struct VendorQuery {
    pub search: Option<String>,
}

async fn list(State(state): State<AppState>, Query(query): Query<VendorQuery>) -> Result<Json<Value>> {
    let vendors = users::list_vendors(&state.db, query.search.as_deref()).await?;
    Ok(Json(json!({ "success": true, "count": vendors.len(), "vendors": vendors })))
}

async fn profile(AuthUser(claims): AuthUser, State(state): State<AppState>) -> Result<Json<Value>> {
    let vendor = users::find(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_vendor())
        .ok_or(ApiError::NotFound("Vendor not found"))?;
    Ok(Json(json!({ "success": true, "vendor": vendor })))
}
