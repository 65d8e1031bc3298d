//! Category tree. Reads are public; writes need `manage_categories`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::ok_message;
use crate::auth::AdminUser;
use crate::domain::aggregates::{Category, CategoryDraft, Permission};
use crate::error::{ApiError, Result};
use crate::repository::categories;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(details).put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = categories::list(&state.db).await?;
    Ok(Json(json!({ "success": true, "categories": categories })))
}

async fn details(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let category = categories::find(&state.db, id).await?.ok_or(ApiError::NotFound("Category not found"))?;
    Ok(Json(json!({ "success": true, "category": category })))
}

async fn create(
    AdminUser(claims): AdminUser,
    State(state): State<AppState>,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<Value>)> {
    claims.require(Permission::ManageCategories)?;
    let category = Category::create(draft)?;
    categories::insert(&state.db, &category).await?;
    info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "category": category }))))
}

async fn update(
    AdminUser(claims): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Json<Value>> {
    claims.require(Permission::ManageCategories)?;
    let mut category = categories::find(&state.db, id).await?.ok_or(ApiError::NotFound("Category not found"))?;
    category.update(draft)?;
    categories::update(&state.db, &category).await?;
    Ok(Json(json!({ "success": true, "category": category })))
}

async fn remove(AdminUser(claims): AdminUser, State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    claims.require(Permission::ManageCategories)?;
    if !categories::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Category not found"));
    }
    info!(category_id = %id, "category deleted");
    Ok(ok_message("Category deleted successfully"))
}
