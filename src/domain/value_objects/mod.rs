//! Value Objects for the marketplace

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest SKU accepted, in bytes.
pub const MAX_SKU_LEN: usize = 50;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > MAX_SKU_LEN { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkuError {
    #[error("SKU empty")]
    Empty,
    #[error("SKU too long")]
    TooLong,
}

/// Prefix of the human-facing identifiers handed out on first save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdPrefix {
    Product,
    User,
    Vendor,
    Admin,
    Order,
}

impl IdPrefix {
    pub fn as_char(self) -> char {
        match self {
            Self::Product => 'P',
            Self::User => 'U',
            Self::Vendor => 'V',
            Self::Admin => 'A',
            Self::Order => 'O',
        }
    }
}

pub const PUBLIC_ID_DIGITS: usize = 8;

/// Prefixed public identifier such as `P00421337`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicId(String);

impl PublicId {
    /// Draws a random candidate. Uniqueness is checked by the repository.
    pub fn random(prefix: IdPrefix) -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..100_000_000);
        Self(format!("{}{:0width$}", prefix.as_char(), n, width = PUBLIC_ID_DIGITS))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Lower-cases a name and joins its words with `-`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Non-negative price check shared by products, variants and line items.
pub fn ensure_non_negative(amount: Decimal) -> Result<Decimal, NegativeAmount> {
    if amount < Decimal::ZERO { Err(NegativeAmount(amount)) } else { Ok(amount) }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("amount must not be negative: {0}")]
pub struct NegativeAmount(pub Decimal);

/// Decimal places kept by every money column.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(14, 2)` column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, MONEY_SCALE)
}

/// A catalogue price: non-negative, at most two decimals, storable.
pub fn ensure_price(amount: Decimal) -> Result<Decimal, PriceError> {
    if amount < Decimal::ZERO {
        return Err(PriceError::Negative);
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(PriceError::TooPrecise);
    }
    if amount > max_amount() {
        return Err(PriceError::TooLarge);
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("Price must not be negative")]
    Negative,
    #[error("Price must have at most 2 decimal places")]
    TooPrecise,
    #[error("Price must not exceed 999999999999.99")]
    TooLarge,
}
