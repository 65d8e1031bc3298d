//! Public catalogue plus vendor-owned product management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ok_message, validate};
use crate::auth::{AuthError, AuthUser, Claims};
use crate::domain::aggregates::{Product, ProductDraft};
use crate::error::{ApiError, Result};
use crate::repository::products::{self, ProductFilter};
use crate::state::AppState;
use crate::variants::{self, VariantType};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/featured", get(featured))
        .route("/top-deals", get(top_deals))
        .route("/flash-sales", get(flash_sales))
        .route("/vendor", get(vendor_products))
        .route("/:id", get(details).put(update).delete(remove))
        .route("/:id/rating", post(rate))
        .route("/:id/variants", post(generate_variants))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RatingRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    pub review: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateVariantsRequest {
    pub types: Vec<VariantType>,
}

fn require_vendor(claims: &Claims) -> Result<Uuid> {
    if claims.is_vendor() { Ok(claims.sub) } else { Err(AuthError::Forbidden.into()) }
}

/// Loads a product the caller owns. Someone else's product reads as missing.
async fn owned_product(state: &AppState, id: Uuid, vendor_id: Uuid) -> Result<Product> {
    products::find(&state.db, id)
        .await?
        .filter(|p| p.is_owned_by(vendor_id))
        .ok_or(ApiError::NotFound("Product not found"))
}

async fn list(State(state): State<AppState>, Query(filter): Query<ProductFilter>) -> Result<Json<Value>> {
    let products = products::search(&state.db, &filter).await?;
    Ok(Json(json!({ "success": true, "count": products.len(), "products": products })))
}

async fn featured(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = products::featured(&state.db).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

async fn top_deals(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = products::top_deals(&state.db).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

async fn flash_sales(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = products::flash_sales(&state.db).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

async fn details(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let product = products::find_listing(&state.db, id).await?.ok_or(ApiError::NotFound("Product not found"))?;
    Ok(Json(json!({ "success": true, "product": product })))
}

async fn vendor_products(AuthUser(claims): AuthUser, State(state): State<AppState>) -> Result<Json<Value>> {
    let vendor_id = require_vendor(&claims)?;
    let products = products::by_vendor(&state.db, vendor_id).await?;
    Ok(Json(json!({ "success": true, "count": products.len(), "products": products })))
}

async fn create(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Value>)> {
    let vendor_id = require_vendor(&claims)?;
    let mut product = Product::create(vendor_id, draft)?;
    products::insert(&state.db, &mut product).await?;
    state.notifier.dispatch(product.take_events()).await;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "product": product }))))
}

async fn update(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Value>> {
    let mut product = owned_product(&state, id, claims.sub).await?;
    product.update(draft)?;
    products::update(&state.db, &product).await?;
    state.notifier.dispatch(product.take_events()).await;
    info!(product_id = %id, "product updated");
    Ok(Json(json!({ "success": true, "product": product })))
}

async fn remove(AuthUser(claims): AuthUser, State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let mut product = owned_product(&state, id, claims.sub).await?;
    if !products::delete_owned(&state.db, id, claims.sub).await? {
        return Err(ApiError::NotFound("Product not found"));
    }
    product.delete();
    state.notifier.dispatch(product.take_events()).await;
    info!(product_id = %id, "product deleted");
    Ok(ok_message("Product removed"))
}

async fn rate(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RatingRequest>,
) -> Result<Json<Value>> {
    validate(&body)?;
    let mut product = products::find(&state.db, id).await?.ok_or(ApiError::NotFound("Product not found"))?;
    product.rate(claims.sub, body.rating, body.review)?;
    products::update(&state.db, &product).await?;
    Ok(Json(json!({
        "success": true,
        "averageRating": product.average_rating,
        "ratings": product.ratings,
    })))
}

/// Replaces the product's variants with every combination of `types`.
async fn generate_variants(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<GenerateVariantsRequest>,
) -> Result<Json<Value>> {
    let mut product = owned_product(&state, id, claims.sub).await?;
    let combinations = variants::generate(&product.name, &body.types)?;
    let generated = combinations.iter().map(|c| c.to_variant()).collect::<std::result::Result<Vec<_>, _>>()?;
    product.replace_variants(generated)?;
    products::update(&state.db, &product).await?;
    state.notifier.dispatch(product.take_events()).await;
    info!(product_id = %id, variants = product.variants.len(), "variants regenerated");
    Ok(Json(json!({ "success": true, "variants": product.variants })))
}
