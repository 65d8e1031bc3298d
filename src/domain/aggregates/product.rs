//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{ensure_price, PriceError, Sku};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub public_id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub vendor_id: Uuid,
    pub images: Vec<String>,
    pub stock: u32,
    pub variants: Vec<Variant>,
    pub status: ProductStatus,
    pub ratings: Vec<Rating>,
    pub average_rating: f64,
    pub tags: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub discount: u8,
    pub flash_sale: FlashSale,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Purchasable configuration embedded in a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    pub sku: Sku,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: Uuid,
    pub rating: u8,
    pub review: Option<String>,
    pub date: DateTime<Utc>,
}

/// Time-bounded discount attached to a product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSale {
    #[serde(default)]
    pub is_active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub discount_price: Option<Decimal>,
}

impl FlashSale {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.discount_price.is_some()
            && self.start_time.map_or(true, |s| s <= now)
            && self.end_time.map_or(true, |e| now < e)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { Active, #[default] Draft, OutOfStock }

/// Fields a vendor supplies when creating or replacing a product.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub variants: Vec<Variant>,
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub discount: u8,
    #[serde(default)]
    pub flash_sale: FlashSale,
}

pub const MAX_DISCOUNT: u8 = 100;

impl ProductDraft {
    fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingField("name")); }
        if self.description.trim().is_empty() { return Err(ProductError::MissingField("description")); }
        if self.category.trim().is_empty() { return Err(ProductError::MissingField("category")); }
        ensure_price(self.price)?;
        if self.discount > MAX_DISCOUNT { return Err(ProductError::InvalidDiscount(self.discount)); }
        if let Some(p) = self.flash_sale.discount_price {
            ensure_price(p)?;
        }
        let mut seen = HashSet::new();
        for v in &self.variants {
            if v.name.trim().is_empty() { return Err(ProductError::MissingField("variant name")); }
            ensure_price(v.price)?;
            if !seen.insert(v.sku.as_str()) { return Err(ProductError::DuplicateVariantSku(v.sku.to_string())); }
        }
        Ok(())
    }
}

impl Product {
    pub fn create(vendor_id: Uuid, draft: ProductDraft) -> Result<Self, ProductError> {
        draft.validate()?;
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), public_id: None, name: draft.name, description: draft.description,
            price: draft.price, category: draft.category, subcategory: draft.subcategory, vendor_id,
            images: draft.images, stock: draft.stock, variants: draft.variants,
            status: draft.status.unwrap_or_default(), ratings: vec![], average_rating: 0.0,
            tags: draft.tags, specifications: draft.specifications, discount: draft.discount,
            flash_sale: draft.flash_sale, created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created(Box::new(product.clone()))));
        Ok(product)
    }

    /// Rebuilds a product read back from storage. No events are raised.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid, public_id: Option<String>, vendor_id: Uuid, draft: ProductDraft, status: ProductStatus,
        ratings: Vec<Rating>, average_rating: f64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, public_id, name: draft.name, description: draft.description, price: draft.price,
            category: draft.category, subcategory: draft.subcategory, vendor_id, images: draft.images,
            stock: draft.stock, variants: draft.variants, status, ratings, average_rating,
            tags: draft.tags, specifications: draft.specifications, discount: draft.discount,
            flash_sale: draft.flash_sale, created_at, updated_at, events: vec![],
        }
    }

    pub fn is_owned_by(&self, vendor_id: Uuid) -> bool { self.vendor_id == vendor_id }
    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    /// Replaces every vendor-editable field. Ratings and identity are kept.
    pub fn update(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        draft.validate()?;
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.category = draft.category;
        self.subcategory = draft.subcategory;
        self.images = draft.images;
        self.stock = draft.stock;
        self.variants = draft.variants;
        if let Some(status) = draft.status { self.status = status; }
        self.tags = draft.tags;
        self.specifications = draft.specifications;
        self.discount = draft.discount;
        self.flash_sale = draft.flash_sale;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Updated(Box::new(self.clone()))));
        Ok(())
    }

    pub fn replace_variants(&mut self, variants: Vec<Variant>) -> Result<(), ProductError> {
        let mut seen = HashSet::new();
        for v in &variants {
            ensure_price(v.price)?;
            if !seen.insert(v.sku.as_str()) { return Err(ProductError::DuplicateVariantSku(v.sku.to_string())); }
        }
        self.variants = variants;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Updated(Box::new(self.clone()))));
        Ok(())
    }

    /// Marks the product as removed so listeners drop it from their views.
    pub fn delete(&mut self) {
        self.raise_event(DomainEvent::Product(ProductEvent::Deleted { product_id: self.id }));
    }

    pub fn variant(&self, sku: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.sku.as_str().eq_ignore_ascii_case(sku))
    }

    /// A user rates a product once; rating again replaces the earlier entry.
    pub fn rate(&mut self, user_id: Uuid, rating: u8, review: Option<String>) -> Result<(), ProductError> {
        if !(1..=5).contains(&rating) { return Err(ProductError::InvalidRating(rating)); }
        self.ratings.retain(|r| r.user_id != user_id);
        self.ratings.push(Rating { user_id, rating, review, date: Utc::now() });
        self.average_rating = average(&self.ratings);
        self.touch();
        Ok(())
    }

    /// Price a customer pays right now: a live flash sale wins, then the percentage discount.
    pub fn current_price(&self, now: DateTime<Utc>) -> Decimal {
        if self.flash_sale.is_live(now) {
            if let Some(p) = self.flash_sale.discount_price { return p; }
        }
        apply_discount(self.price, self.discount)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub fn apply_discount(price: Decimal, discount: u8) -> Decimal {
    if discount == 0 { return price; }
    (price * Decimal::from(100 - u32::from(discount.min(MAX_DISCOUNT))) / Decimal::from(100)).round_dp(2)
}

fn average(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() { return 0.0; }
    ratings.iter().map(|r| f64::from(r.rating)).sum::<f64>() / ratings.len() as f64
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProductError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error("Discount must be between 0 and 100, got {0}")]
    InvalidDiscount(u8),
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("Duplicate variant SKU {0}")]
    DuplicateVariantSku(String),
}
