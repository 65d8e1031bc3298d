//! `products` table and the public catalogue queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{enum_from_text, enum_to_text, like_pattern, qualified, to_i32, to_u32, unique_public_id, RepositoryError};
use crate::domain::aggregates::{FlashSale, Product, ProductDraft, Rating, Variant};
use crate::domain::value_objects::IdPrefix;

const COLUMNS: &str = "id, public_id, name, description, price, category, subcategory, vendor_id, images, stock, \
    variants, status, ratings, average_rating, tags, specifications, discount, flash_sale, created_at, updated_at";

const FEATURED_LIMIT: i64 = 6;
const DEALS_LIMIT: i64 = 4;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    public_id: Option<String>,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    subcategory: Option<String>,
    vendor_id: Uuid,
    images: Vec<String>,
    stock: i32,
    variants: Json<Vec<Variant>>,
    status: String,
    ratings: Json<Vec<Rating>>,
    average_rating: f64,
    tags: Vec<String>,
    specifications: Json<BTreeMap<String, String>>,
    discount: i16,
    flash_sale: Json<FlashSale>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let discount = u8::try_from(row.discount)
            .map_err(|_| RepositoryError::Corrupt { column: "discount", value: row.discount.to_string() })?;
        let draft = ProductDraft {
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            subcategory: row.subcategory,
            images: row.images,
            stock: to_u32("stock", row.stock)?,
            variants: row.variants.0,
            status: None,
            tags: row.tags,
            specifications: row.specifications.0,
            discount,
            flash_sale: row.flash_sale.0,
        };
        Ok(Product::restore(
            row.id,
            row.public_id,
            row.vendor_id,
            draft,
            enum_from_text("status", &row.status)?,
            row.ratings.0,
            row.average_rating,
            row.created_at,
            row.updated_at,
        ))
    }
}

/// Vendor name fields joined onto public listings.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRef {
    pub id: Uuid,
    pub name: String,
    pub store_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub vendor: Option<VendorRef>,
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    vendor_name: Option<String>,
    vendor_store_name: Option<String>,
}

impl TryFrom<ListingRow> for ProductListing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let product = Product::try_from(row.product)?;
        let vendor = row.vendor_name.map(|name| VendorRef { id: product.vendor_id, name, store_name: row.vendor_store_name });
        Ok(Self { product, vendor })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort { PriceAsc, PriceDesc, NameAsc, NameDesc, #[default] Newest }

impl ProductSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::PriceAsc => "p.price ASC",
            Self::PriceDesc => "p.price DESC",
            Self::NameAsc => "p.name ASC",
            Self::NameDesc => "p.name DESC",
            Self::Newest => "p.created_at DESC",
        }
    }
}

/// Public catalogue filter. Only active products are ever listed.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort_by: ProductSort,
}

fn listing_query() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {}, u.name AS vendor_name, u.store_name AS vendor_store_name \
         FROM products p LEFT JOIN users u ON u.id = p.vendor_id WHERE p.status = 'active'",
        qualified(COLUMNS, "p")
    ))
}

async fn fetch_listings(db: &PgPool, mut query: QueryBuilder<'_, Postgres>) -> Result<Vec<ProductListing>, RepositoryError> {
    query
        .build_query_as::<ListingRow>()
        .fetch_all(db)
        .await?
        .into_iter()
        .map(ProductListing::try_from)
        .collect()
}

pub async fn search(db: &PgPool, filter: &ProductFilter) -> Result<Vec<ProductListing>, RepositoryError> {
    let mut query = listing_query();
    if let Some(pattern) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(like_pattern) {
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.category ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query.push(" AND p.category = ").push_bind(category.to_string());
    }
    if let Some(min) = filter.min_price {
        query.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        query.push(" AND p.price <= ").push_bind(max);
    }
    query.push(" ORDER BY ").push(filter.sort_by.order_by());
    fetch_listings(db, query).await
}

/// Newest active products that are in stock.
pub async fn featured(db: &PgPool) -> Result<Vec<ProductListing>, RepositoryError> {
    let mut query = listing_query();
    query.push(" AND p.stock > 0 ORDER BY p.created_at DESC LIMIT ").push_bind(FEATURED_LIMIT);
    fetch_listings(db, query).await
}

/// Biggest percentage discounts first.
pub async fn top_deals(db: &PgPool) -> Result<Vec<ProductListing>, RepositoryError> {
    let mut query = listing_query();
    query.push(" AND p.discount > 0 ORDER BY p.discount DESC LIMIT ").push_bind(DEALS_LIMIT);
    fetch_listings(db, query).await
}

/// Active flash sales, ending soonest first.
pub async fn flash_sales(db: &PgPool) -> Result<Vec<ProductListing>, RepositoryError> {
    let mut query = listing_query();
    query
        .push(" AND COALESCE((p.flash_sale->>'isActive')::BOOLEAN, FALSE)")
        .push(" ORDER BY (p.flash_sale->>'endTime')::TIMESTAMPTZ ASC NULLS LAST LIMIT ")
        .push_bind(DEALS_LIMIT);
    fetch_listings(db, query).await
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Product>, RepositoryError> {
    sqlx::query_as::<_, ProductRow>(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Product::try_from)
        .transpose()
}

/// Any status; used for product detail pages.
pub async fn find_listing(db: &PgPool, id: Uuid) -> Result<Option<ProductListing>, RepositoryError> {
    let sql = format!(
        "SELECT {}, u.name AS vendor_name, u.store_name AS vendor_store_name \
         FROM products p LEFT JOIN users u ON u.id = p.vendor_id WHERE p.id = $1",
        qualified(COLUMNS, "p")
    );
    sqlx::query_as::<_, ListingRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(ProductListing::try_from)
        .transpose()
}

pub async fn find_many(db: &PgPool, ids: &[Uuid]) -> Result<Vec<Product>, RepositoryError> {
    sqlx::query_as::<_, ProductRow>(&format!("SELECT {COLUMNS} FROM products WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
}

pub async fn by_vendor(db: &PgPool, vendor_id: Uuid) -> Result<Vec<Product>, RepositoryError> {
    sqlx::query_as::<_, ProductRow>(&format!("SELECT {COLUMNS} FROM products WHERE vendor_id = $1 ORDER BY created_at DESC"))
        .bind(vendor_id)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
}

pub async fn count(db: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(db).await?;
    Ok(count)
}

/// Assigns the public id on first save, then inserts.
pub async fn insert(db: &PgPool, product: &mut Product) -> Result<(), RepositoryError> {
    if product.public_id.is_none() {
        product.public_id = Some(unique_public_id(db, IdPrefix::Product, "products", "public_id").await?);
    }
    sqlx::query(&format!(
        "INSERT INTO products ({COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
    ))
    .bind(product.id)
    .bind(&product.public_id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.subcategory)
    .bind(product.vendor_id)
    .bind(&product.images)
    .bind(to_i32("stock", product.stock)?)
    .bind(Json(&product.variants))
    .bind(enum_to_text(&product.status))
    .bind(Json(&product.ratings))
    .bind(product.average_rating)
    .bind(&product.tags)
    .bind(Json(&product.specifications))
    .bind(i16::from(product.discount))
    .bind(Json(&product.flash_sale))
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(db)
    .await?;
    tracing::info!(product_id = %product.id, vendor_id = %product.vendor_id, "product created");
    Ok(())
}

pub async fn update(db: &PgPool, product: &Product) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE products SET name = $2, description = $3, price = $4, category = $5, subcategory = $6, images = $7, \
         stock = $8, variants = $9, status = $10, ratings = $11, average_rating = $12, tags = $13, \
         specifications = $14, discount = $15, flash_sale = $16, updated_at = $17 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.subcategory)
    .bind(&product.images)
    .bind(to_i32("stock", product.stock)?)
    .bind(Json(&product.variants))
    .bind(enum_to_text(&product.status))
    .bind(Json(&product.ratings))
    .bind(product.average_rating)
    .bind(&product.tags)
    .bind(Json(&product.specifications))
    .bind(i16::from(product.discount))
    .bind(Json(&product.flash_sale))
    .bind(product.updated_at)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes only when `vendor_id` owns the product.
pub async fn delete_owned(db: &PgPool, id: Uuid, vendor_id: Uuid) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND vendor_id = $2")
        .bind(id)
        .bind(vendor_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parses_kebab_names() {
        let filter: ProductFilter = serde_json::from_str(r#"{"sortBy":"price-desc","minPrice":5}"#).unwrap();
        assert_eq!(filter.sort_by, ProductSort::PriceDesc);
        assert_eq!(filter.min_price, Some(Decimal::new(5, 0)));
        let filter: ProductFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.sort_by, ProductSort::Newest);
    }

    #[test]
    fn test_search_query_shape() {
        let mut query = listing_query();
        query.push(" ORDER BY ").push(ProductSort::NameAsc.order_by());
        let sql = query.sql();
        assert!(sql.contains("p.status = 'active'"));
        assert!(sql.ends_with("ORDER BY p.name ASC"));
    }
}
