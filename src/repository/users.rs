//! `users` table: customers and vendors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{enum_from_text, enum_to_text, like_pattern, qualified, unique_public_id, unique_violation, RepositoryError};
use crate::domain::aggregates::{ShippingAddress, User, UserRole};
use crate::domain::value_objects::IdPrefix;

const COLUMNS: &str = "id, public_id, vendor_public_id, name, email, password_hash, role, store_name, phone_number, \
    address, description, logo, store_status, shipping_addresses, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    public_id: Option<String>,
    vendor_public_id: Option<String>,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    store_name: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    description: Option<String>,
    logo: Option<String>,
    store_status: String,
    shipping_addresses: Json<Vec<ShippingAddress>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            public_id: row.public_id,
            vendor_public_id: row.vendor_public_id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: enum_from_text("role", &row.role)?,
            store_name: row.store_name,
            phone_number: row.phone_number,
            address: row.address,
            description: row.description,
            logo: row.logo,
            store_status: enum_from_text("store_status", &row.store_status)?,
            shipping_addresses: row.shipping_addresses.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A vendor with aggregate figures over their catalogue.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSummary {
    #[serde(flatten)]
    pub vendor: User,
    pub total_products: i64,
    pub total_reviews: i64,
    pub rating: f64,
}

#[derive(sqlx::FromRow)]
struct VendorSummaryRow {
    #[sqlx(flatten)]
    user: UserRow,
    total_products: i64,
    total_reviews: i64,
    rating: f64,
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<User>, RepositoryError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, RepositoryError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(db)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn list(db: &PgPool) -> Result<Vec<User>, RepositoryError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users ORDER BY created_at DESC"))
        .fetch_all(db)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
}

/// Assigns the public ids on first save, then inserts.
pub async fn insert(db: &PgPool, user: &mut User) -> Result<(), RepositoryError> {
    if user.public_id.is_none() {
        user.public_id = Some(unique_public_id(db, IdPrefix::User, "users", "public_id").await?);
    }
    if user.role == UserRole::Vendor && user.vendor_public_id.is_none() {
        user.vendor_public_id = Some(unique_public_id(db, IdPrefix::Vendor, "users", "vendor_public_id").await?);
    }
    sqlx::query(&format!(
        "INSERT INTO users ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
    ))
    .bind(user.id)
    .bind(&user.public_id)
    .bind(&user.vendor_public_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(enum_to_text(&user.role))
    .bind(&user.store_name)
    .bind(&user.phone_number)
    .bind(&user.address)
    .bind(&user.description)
    .bind(&user.logo)
    .bind(enum_to_text(&user.store_status))
    .bind(Json(&user.shipping_addresses))
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(db)
    .await
    .map_err(unique_violation("User"))?;
    tracing::info!(user_id = %user.id, role = ?user.role, "user created");
    Ok(())
}

/// Writes back every mutable field. Returns `false` when the row is gone.
pub async fn update(db: &PgPool, user: &mut User) -> Result<bool, RepositoryError> {
    if user.role == UserRole::Vendor && user.vendor_public_id.is_none() {
        user.vendor_public_id = Some(unique_public_id(db, IdPrefix::Vendor, "users", "vendor_public_id").await?);
    }
    let result = sqlx::query(
        "UPDATE users SET vendor_public_id = $2, name = $3, email = $4, password_hash = $5, role = $6, store_name = $7, \
         phone_number = $8, address = $9, description = $10, logo = $11, store_status = $12, shipping_addresses = $13, \
         updated_at = $14 WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.vendor_public_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(enum_to_text(&user.role))
    .bind(&user.store_name)
    .bind(&user.phone_number)
    .bind(&user.address)
    .bind(&user.description)
    .bind(&user.logo)
    .bind(enum_to_text(&user.store_status))
    .bind(Json(&user.shipping_addresses))
    .bind(user.updated_at)
    .execute(db)
    .await
    .map_err(unique_violation("User"))?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_by_role(db: &PgPool, role: UserRole) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(enum_to_text(&role))
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Vendors, newest first, with product count, review count and mean rating.
/// `search` matches store name, name or description.
pub async fn list_vendors(db: &PgPool, search: Option<&str>) -> Result<Vec<VendorSummary>, RepositoryError> {
    let pattern = search.map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);
    let columns = qualified(COLUMNS, "u");
    let sql = format!(
        "SELECT {columns}, \
            COALESCE(s.total_products, 0) AS total_products, \
            COALESCE(s.total_reviews, 0) AS total_reviews, \
            COALESCE(s.rating, 0) AS rating \
         FROM users u \
         LEFT JOIN LATERAL ( \
            SELECT COUNT(*)::BIGINT AS total_products, \
                   COALESCE(SUM(jsonb_array_length(p.ratings)), 0)::BIGINT AS total_reviews, \
                   (SELECT AVG((r->>'rating')::DOUBLE PRECISION) \
                      FROM products p2, jsonb_array_elements(p2.ratings) r \
                     WHERE p2.vendor_id = u.id) AS rating \
              FROM products p WHERE p.vendor_id = u.id \
         ) s ON TRUE \
         WHERE u.role = 'vendor' \
           AND ($1::TEXT IS NULL OR u.store_name ILIKE $1 OR u.name ILIKE $1 OR u.description ILIKE $1) \
         ORDER BY u.created_at DESC"
    );
    sqlx::query_as::<_, VendorSummaryRow>(&sql)
        .bind(pattern)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(|row| {
            Ok(VendorSummary {
                vendor: User::try_from(row.user)?,
                total_products: row.total_products,
                total_reviews: row.total_reviews,
                rating: row.rating,
            })
        })
        .collect()
}
