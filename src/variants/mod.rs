//! Variant management: option sets per variant type, their Cartesian
//! combinations, SKU generation and bulk import/export.
//!
//! A product is configured with a list of [`VariantType`]s (e.g. `Size`,
//! `Color`), each holding [`VariantOption`]s with their own price, stock and
//! shipping rules. [`combinations::generate`] expands them into purchasable
//! configurations; [`bulk`] moves them in and out of CSV and JSON.

pub mod bulk;
pub mod combinations;
pub mod sku;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shipping::ShippingRules;

pub use combinations::{generate, Combination, Selection, MAX_COMBINATIONS};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantType {
    #[serde(rename = "type")]
    pub variant_type: String,
    #[serde(default)]
    pub options: Vec<VariantOption>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub image: Option<String>,
    pub shipping_rules: Option<ShippingRules>,
}

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("{count} combinations exceeds the limit of {limit}")]
    TooManyCombinations { count: u128, limit: usize },
    #[error("Combined price overflowed")]
    PriceOverflow,
    #[error("Row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid SKU: {0}")]
    Sku(#[from] crate::domain::value_objects::SkuError),
}
