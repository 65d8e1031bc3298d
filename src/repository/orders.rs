//! `orders` table and the vendor dashboard queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{enum_from_text, enum_to_text, qualified, unique_public_id, Page, RepositoryError};
use crate::domain::aggregates::{Address, Order, OrderItem, OrderStatus};
use crate::domain::value_objects::IdPrefix;

const COLUMNS: &str = "id, public_id, customer_id, vendor_id, items, total_amount, status, shipping_address, \
    payment_status, created_at, updated_at";

pub const RECENT_LIMIT: i64 = 5;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    public_id: Option<String>,
    customer_id: Uuid,
    vendor_id: Uuid,
    items: Json<Vec<OrderItem>>,
    total_amount: Decimal,
    status: String,
    shipping_address: Option<Json<Address>>,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order::restore(
            row.id,
            row.public_id,
            row.customer_id,
            row.vendor_id,
            row.items.0,
            row.total_amount,
            enum_from_text("status", &row.status)?,
            row.shipping_address.map(|a| a.0),
            enum_from_text("payment_status", &row.payment_status)?,
            row.created_at,
            row.updated_at,
        ))
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// An order with its customer's contact details.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<CustomerRef>,
}

#[derive(sqlx::FromRow)]
struct OrderViewRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: Option<String>,
    customer_email: Option<String>,
}

impl TryFrom<OrderViewRow> for OrderView {
    type Error = RepositoryError;

    fn try_from(row: OrderViewRow) -> Result<Self, Self::Error> {
        let order = Order::try_from(row.order)?;
        let customer = match (row.customer_name, row.customer_email) {
            (Some(name), Some(email)) => Some(CustomerRef { id: order.customer_id, name, email }),
            _ => None,
        };
        Ok(Self { order, customer })
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Applied only when both bounds are present.
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_sales: Decimal,
    pub total_revenue: Decimal,
    pub pending_orders: i64,
}

fn view_query() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {}, c.name AS customer_name, c.email AS customer_email \
         FROM orders o LEFT JOIN users c ON c.id = o.customer_id WHERE TRUE",
        qualified(COLUMNS, "o")
    ))
}

fn push_vendor_filter(query: &mut QueryBuilder<'_, Postgres>, vendor_id: Uuid, filter: &OrderFilter) {
    query.push(" AND o.vendor_id = ").push_bind(vendor_id);
    if let Some(status) = filter.status {
        query.push(" AND o.status = ").push_bind(enum_to_text(&status));
    }
    if let Some((start, end)) = filter.created_between {
        query.push(" AND o.created_at BETWEEN ").push_bind(start).push(" AND ").push_bind(end);
    }
}

async fn fetch_views(db: &PgPool, mut query: QueryBuilder<'_, Postgres>) -> Result<Vec<OrderView>, RepositoryError> {
    query
        .build_query_as::<OrderViewRow>()
        .fetch_all(db)
        .await?
        .into_iter()
        .map(OrderView::try_from)
        .collect()
}

/// One page of a vendor's orders, newest first, plus the unpaged total.
pub async fn list_for_vendor(
    db: &PgPool,
    vendor_id: Uuid,
    filter: &OrderFilter,
    page: Page,
) -> Result<(Vec<OrderView>, i64), RepositoryError> {
    let mut query = view_query();
    push_vendor_filter(&mut query, vendor_id, filter);
    query
        .push(" ORDER BY o.created_at DESC LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let orders = fetch_views(db, query).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o WHERE TRUE");
    push_vendor_filter(&mut count, vendor_id, filter);
    let (total,) = count.build_query_as::<(i64,)>().fetch_one(db).await?;
    Ok((orders, total))
}

pub async fn recent_for_vendor(db: &PgPool, vendor_id: Uuid) -> Result<Vec<OrderView>, RepositoryError> {
    let mut query = view_query();
    query
        .push(" AND o.vendor_id = ")
        .push_bind(vendor_id)
        .push(" ORDER BY o.created_at DESC LIMIT ")
        .push_bind(RECENT_LIMIT);
    fetch_views(db, query).await
}

/// Only finds orders belonging to `vendor_id`.
pub async fn find_for_vendor(db: &PgPool, id: Uuid, vendor_id: Uuid) -> Result<Option<OrderView>, RepositoryError> {
    let mut query = view_query();
    query.push(" AND o.id = ").push_bind(id).push(" AND o.vendor_id = ").push_bind(vendor_id);
    query
        .build_query_as::<OrderViewRow>()
        .fetch_optional(db)
        .await?
        .map(OrderView::try_from)
        .transpose()
}

/// Totals over a vendor's orders created since `since`.
pub async fn stats_since(db: &PgPool, vendor_id: Uuid, since: DateTime<Utc>) -> Result<OrderStats, RepositoryError> {
    let stats = sqlx::query_as::<_, OrderStats>(
        "SELECT COUNT(*)::BIGINT AS total_orders, \
                COALESCE(SUM(total_amount), 0) AS total_sales, \
                COALESCE(SUM(total_amount), 0) AS total_revenue, \
                COUNT(*) FILTER (WHERE status = 'pending')::BIGINT AS pending_orders \
         FROM orders WHERE vendor_id = $1 AND created_at >= $2",
    )
    .bind(vendor_id)
    .bind(since)
    .fetch_one(db)
    .await?;
    Ok(stats)
}

pub async fn count(db: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(db).await?;
    Ok(count)
}

pub async fn total_revenue(db: &PgPool) -> Result<Decimal, RepositoryError> {
    let (total,): (Decimal,) = sqlx::query_as("SELECT COALESCE(SUM(total_amount), 0) FROM orders").fetch_one(db).await?;
    Ok(total)
}

pub async fn insert(db: &PgPool, order: &mut Order) -> Result<(), RepositoryError> {
    if order.public_id.is_none() {
        order.public_id = Some(unique_public_id(db, IdPrefix::Order, "orders", "public_id").await?);
    }
    sqlx::query(&format!("INSERT INTO orders ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"))
        .bind(order.id)
        .bind(&order.public_id)
        .bind(order.customer_id)
        .bind(order.vendor_id)
        .bind(Json(&order.items))
        .bind(order.total_amount)
        .bind(enum_to_text(&order.status))
        .bind(order.shipping_address.as_ref().map(Json))
        .bind(enum_to_text(&order.payment_status))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(db)
        .await?;
    tracing::info!(order_id = %order.id, vendor_id = %order.vendor_id, total = %order.total_amount, "order created");
    Ok(())
}

pub async fn update_status(db: &PgPool, order: &Order) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE orders SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1")
        .bind(order.id)
        .bind(enum_to_text(&order.status))
        .bind(enum_to_text(&order.payment_status))
        .bind(order.updated_at)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_vendor_filter_sql() {
        let mut query = view_query();
        let now = Utc::now();
        let filter = OrderFilter { status: Some(OrderStatus::Shipped), created_between: Some((now - Duration::days(7), now)) };
        push_vendor_filter(&mut query, Uuid::now_v7(), &filter);
        let sql = query.sql();
        assert!(sql.contains("o.vendor_id = $1"));
        assert!(sql.contains("o.status = $2"));
        assert!(sql.contains("o.created_at BETWEEN $3 AND $4"));
    }

    #[test]
    fn test_empty_stats_serialize_as_zero() {
        let stats = serde_json::to_value(OrderStats::default()).unwrap();
        assert_eq!(stats["totalOrders"], 0);
        assert_eq!(stats["pendingOrders"], 0);
    }
}
