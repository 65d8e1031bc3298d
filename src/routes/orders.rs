//! Order placement and the vendor order dashboard.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::aggregates::{Address, Order, OrderError, OrderItem, OrderStatus, Product};
use crate::error::{ApiError, Result};
use crate::repository::orders::{self, OrderFilter, OrderView};
use crate::repository::{products, users, Page};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/vendor", get(vendor_orders))
        .route("/stats/overview", get(stats_overview))
        .route("/recent", get(recent))
        .route("/:id", get(details))
        .route("/:id/status", patch(update_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl OrderQuery {
    fn filter(&self) -> Result<OrderFilter> {
        let created_between = match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => Some((parse_date(start)?, parse_date(end)?)),
            _ => None,
        };
        Ok(OrderFilter { status: self.status, created_between })
    }
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {value}")))
}

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive() - Duration::days(i64::from(now.day0()));
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub variant_sku: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: Option<Address>,
}

/// Prices every line from the catalogue and checks that one vendor sells
/// all of it. Returns that vendor with the priced items.
fn price_lines(lines: Vec<OrderLineRequest>, catalogue: &[Product], now: DateTime<Utc>) -> Result<(Uuid, Vec<OrderItem>)> {
    let by_id: HashMap<Uuid, &Product> = catalogue.iter().map(|p| (p.id, p)).collect();
    let mut vendor = None;
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let product = by_id.get(&line.product_id).ok_or(ApiError::NotFound("Product not found"))?;
        if *vendor.get_or_insert(product.vendor_id) != product.vendor_id {
            return Err(ApiError::BadRequest("All items in an order must come from one vendor".into()));
        }
        let price = match line.variant_sku.as_deref() {
            Some(sku) => product
                .variant(sku)
                .map(|v| v.price)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown variant {sku} for {}", product.name)))?,
            None => product.current_price(now),
        };
        items.push(OrderItem { product_id: product.id, variant_sku: line.variant_sku, quantity: line.quantity, price });
    }
    let vendor = vendor.ok_or(OrderError::NoItems)?;
    Ok((vendor, items))
}

async fn vendor_orders(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Value>> {
    let page = Page::new(query.page, query.limit);
    let filter = query.filter()?;
    let (orders, total) = orders::list_for_vendor(&state.db, claims.sub, &filter, page).await?;
    Ok(Json(json!({
        "success": true,
        "orders": orders,
        "pagination": {
            "total": total,
            "pages": page.total_pages(total),
            "currentPage": page.page,
            "perPage": page.limit,
        },
    })))
}

async fn stats_overview(AuthUser(claims): AuthUser, State(state): State<AppState>) -> Result<Json<Value>> {
    let stats = orders::stats_since(&state.db, claims.sub, month_start(Utc::now())).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

async fn recent(AuthUser(claims): AuthUser, State(state): State<AppState>) -> Result<Json<Value>> {
    let orders = orders::recent_for_vendor(&state.db, claims.sub).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

async fn details(AuthUser(claims): AuthUser, State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let order = orders::find_for_vendor(&state.db, id, claims.sub).await?.ok_or(ApiError::NotFound("Order not found"))?;
    Ok(Json(json!({ "success": true, "order": order })))
}

async fn update_status(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Value>> {
    let mut view: OrderView =
        orders::find_for_vendor(&state.db, id, claims.sub).await?.ok_or(ApiError::NotFound("Order not found"))?;
    view.order.update_status(body.status)?;
    orders::update_status(&state.db, &view.order).await?;
    state.notifier.dispatch(view.order.take_events()).await;
    info!(order_id = %id, status = ?body.status, "order status updated");
    Ok(Json(json!({ "success": true, "order": view })))
}

async fn create(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let customer = users::find(&state.db, claims.sub).await?.ok_or(ApiError::NotFound("User not found"))?;
    let ids: Vec<Uuid> = body.items.iter().map(|l| l.product_id).collect();
    let catalogue = products::find_many(&state.db, &ids).await?;
    let (vendor_id, items) = price_lines(body.items, &catalogue, Utc::now())?;
    let address = body.shipping_address.or_else(|| customer.default_shipping_address().cloned());

    let mut order = Order::place(customer.id, vendor_id, items, address)?;
    orders::insert(&state.db, &mut order).await?;
    state.notifier.dispatch(order.take_events()).await;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "order": order }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{FlashSale, ProductDraft, Variant};
    use crate::domain::value_objects::{max_amount, Sku};
    use rust_decimal::Decimal;

    fn product(vendor_id: Uuid, cents: i64) -> Product {
        let draft = ProductDraft {
            name: "Mug".into(),
            description: "Stoneware".into(),
            price: Decimal::new(cents, 2),
            category: "Kitchen".into(),
            variants: vec![Variant {
                name: "Blue".into(),
                sku: Sku::new("MUG-BL").unwrap(),
                price: Decimal::new(1500, 2),
                stock: 2,
                images: vec![],
            }],
            flash_sale: FlashSale::default(),
            ..Default::default()
        };
        Product::create(vendor_id, draft).unwrap()
    }

    fn line(product_id: Uuid, sku: Option<&str>, quantity: u32) -> OrderLineRequest {
        OrderLineRequest { product_id, variant_sku: sku.map(str::to_string), quantity }
    }

    #[test]
    fn test_lines_priced_from_catalogue() {
        let vendor = Uuid::now_v7();
        let mug = product(vendor, 1200);
        let (v, items) = price_lines(vec![line(mug.id, None, 2), line(mug.id, Some("mug-bl"), 1)], &[mug], Utc::now()).unwrap();
        assert_eq!(v, vendor);
        assert_eq!(items[0].price, Decimal::new(1200, 2));
        assert_eq!(items[1].price, Decimal::new(1500, 2));
    }

    #[test]
    fn test_mixed_vendors_rejected() {
        let a = product(Uuid::now_v7(), 100);
        let b = product(Uuid::now_v7(), 100);
        let err = price_lines(vec![line(a.id, None, 1), line(b.id, None, 1)], &[a, b], Utc::now()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_product_and_variant() {
        let mug = product(Uuid::now_v7(), 100);
        let err = price_lines(vec![line(Uuid::now_v7(), None, 1)], &[mug.clone()], Utc::now()).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = price_lines(vec![line(mug.id, Some("NOPE"), 1)], &[mug], Utc::now()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = price_lines(vec![], &[], Utc::now()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_huge_quantity_is_bad_request() {
        let mut mug = product(Uuid::now_v7(), 100);
        mug.variants[0].price = max_amount();
        let (vendor, items) = price_lines(vec![line(mug.id, Some("MUG-BL"), u32::MAX)], &[mug], Utc::now()).unwrap();
        let err = ApiError::from(Order::place(Uuid::now_v7(), vendor, items, None).unwrap_err());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Order total is too large");
    }

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 17, 15, 4, 5).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_date_filter_needs_both_bounds() {
        let query = OrderQuery { start_date: Some("2024-01-01".into()), ..Default::default() };
        assert!(query.filter().unwrap().created_between.is_none());

        let query = OrderQuery {
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-31T23:59:59Z".into()),
            ..Default::default()
        };
        let (start, end) = query.filter().unwrap().created_between.unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());

        let bad = OrderQuery { start_date: Some("soon".into()), end_date: Some("later".into()), ..Default::default() };
        assert!(bad.filter().is_err());
    }
}
