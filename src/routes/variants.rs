//! Variant tooling for the product editor: combinations, SKUs, bulk files
//! and shipping quotes. Nothing here touches storage.

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::shipping::{self, ShippingRules, Template, ZONES};
use crate::state::AppState;
use crate::variants::bulk::{self, Format};
use crate::variants::sku::{self, SkuMode};
use crate::variants::{combinations, VariantType};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/combinations", post(generate_combinations))
        .route("/skus", post(generate_skus))
        .route("/export", post(export))
        .route("/import", post(import))
        .route("/options/parse", post(parse_options))
        .route("/shipping/zones", get(shipping_zones))
        .route("/shipping/templates", get(shipping_templates))
        .route("/shipping/quote", post(shipping_quote))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSetRequest {
    #[serde(default)]
    pub product_name: String,
    pub types: Vec<VariantType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

impl FormatQuery {
    fn format(&self) -> Result<Format> {
        self.format.as_deref().unwrap_or("csv").parse::<Format>().map_err(ApiError::from)
    }
}

/// Either a `zone` (rates by chargeable weight) or a `template` (fixed
/// limits). Option surcharges only apply to zone quotes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub zone: Option<String>,
    pub template: Option<String>,
    #[serde(flatten)]
    pub rules: ShippingRules,
}

fn quote(request: &QuoteRequest) -> Result<Decimal> {
    let dimensions = request.rules.dimensions.unwrap_or_default();
    match (request.zone.as_deref(), request.template.as_deref()) {
        (Some(zone), _) => Ok(shipping::quote_option(shipping::zone(zone)?, &request.rules)?),
        (None, Some(template)) => {
            let template: Template = template.parse()?;
            Ok(template.quote(request.rules.weight.unwrap_or_default(), &dimensions)?)
        }
        (None, None) => Err(ApiError::BadRequest("A shipping zone or template is required".into())),
    }
}

async fn generate_combinations(_: AuthUser, Json(body): Json<VariantSetRequest>) -> Result<Json<Value>> {
    let combinations = combinations::generate(&body.product_name, &body.types)?;
    debug!(count = combinations.len(), "combinations generated");
    Ok(Json(json!({ "success": true, "count": combinations.len(), "combinations": combinations })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SkuQuery {
    #[serde(default)]
    pub mode: SkuMode,
}

/// `?mode=random|slug|numbered`, random by default.
async fn generate_skus(
    _: AuthUser,
    Query(query): Query<SkuQuery>,
    Json(body): Json<VariantSetRequest>,
) -> Result<Json<Value>> {
    let mut types = body.types;
    let assigned = sku::assign(query.mode, &body.product_name, &mut types, &mut rand::thread_rng());
    sku::assign_barcodes(&mut types);
    Ok(Json(json!({ "success": true, "assigned": assigned, "types": types })))
}

async fn export(
    _: AuthUser,
    Query(query): Query<FormatQuery>,
    Json(body): Json<VariantSetRequest>,
) -> Result<impl IntoResponse> {
    let format = query.format()?;
    let file = bulk::export(&body.types, format)?;
    let disposition = format!("attachment; filename=\"variants.{}\"", format.extension());
    Ok(([(CONTENT_TYPE, format.content_type().to_string()), (CONTENT_DISPOSITION, disposition)], file))
}

/// The request body is the raw file.
async fn import(_: AuthUser, Query(query): Query<FormatQuery>, body: Bytes) -> Result<Json<Value>> {
    let format = query.format()?;
    let types = bulk::import(&body, format)?;
    let options: usize = types.iter().map(|t| t.options.len()).sum();
    debug!(types = types.len(), options, "variants imported");
    Ok(Json(json!({ "success": true, "types": types })))
}

/// Pasted `name,price,stock` lines for a single variant type.
async fn parse_options(_: AuthUser, body: String) -> Result<Json<Value>> {
    let options = bulk::parse_option_lines(&body)?;
    Ok(Json(json!({ "success": true, "options": options })))
}

async fn shipping_zones() -> Json<Value> {
    Json(json!({ "success": true, "zones": ZONES }))
}

async fn shipping_templates() -> Json<Value> {
    let templates: Vec<Value> = Template::ALL.iter().map(|t| json!({ "id": t, "spec": t.spec() })).collect();
    Json(json!({ "success": true, "templates": templates }))
}

async fn shipping_quote(_: AuthUser, Json(body): Json<QuoteRequest>) -> Result<Json<Value>> {
    let cost = quote(&body)?;
    Ok(Json(json!({ "success": true, "cost": cost })))
}
