//! PostgreSQL persistence for the aggregates.
//!
//! Each submodule owns one table. Embedded documents are stored as JSONB
//! through [`sqlx::types::Json`]; enum columns hold their serde names.

pub mod admins;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::domain::value_objects::{IdPrefix, PublicId};

/// Draws before giving up on finding an unused public id.
pub const PUBLIC_ID_ATTEMPTS: usize = 10;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("Corrupt {column} value: {value}")]
    Corrupt { column: &'static str, value: String },
    #[error("No unused {0:?} id after {PUBLIC_ID_ATTEMPTS} attempts")]
    IdExhausted(IdPrefix),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self { Self::Database(e) }
}

/// Turns a unique-constraint violation into [`RepositoryError::Duplicate`].
pub(crate) fn unique_violation(what: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate(what.to_string()),
        _ => RepositoryError::Database(e),
    }
}

/// Serde name of a unit enum variant, as stored in TEXT columns.
pub(crate) fn enum_to_text<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        other => other.map(|v| v.to_string()).unwrap_or_default(),
    }
}

pub(crate) fn enum_from_text<T: DeserializeOwned>(column: &'static str, value: &str) -> Result<T, RepositoryError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| RepositoryError::Corrupt { column, value: value.to_string() })
}

pub(crate) fn to_i32(column: &'static str, value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value).map_err(|_| RepositoryError::Corrupt { column, value: value.to_string() })
}

pub(crate) fn to_u32(column: &'static str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| RepositoryError::Corrupt { column, value: value.to_string() })
}

/// Prefixes each column of a comma-separated list with `alias.`.
pub(crate) fn qualified(columns: &str, alias: &str) -> String {
    columns.split(',').map(|c| format!("{alias}.{}", c.trim())).collect::<Vec<_>>().join(", ")
}

/// `%term%` for ILIKE, with the pattern metacharacters escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// Draws random public ids until one is unused in `table.column`.
pub async fn unique_public_id(
    db: &PgPool,
    prefix: IdPrefix,
    table: &'static str,
    column: &'static str,
) -> Result<String, RepositoryError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = $1)");
    for _ in 0..PUBLIC_ID_ATTEMPTS {
        let candidate = PublicId::random(prefix).into_inner();
        let (taken,): (bool,) = sqlx::query_as(&sql).bind(&candidate).fetch_one(db).await?;
        if !taken {
            return Ok(candidate);
        }
        tracing::debug!(%candidate, table, "public id collision");
    }
    Err(RepositoryError::IdExhausted(prefix))
}

/// Page number and size as sent by clients, clamped to sane bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.limit) }

    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{OrderStatus, ProductStatus};

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!(enum_to_text(&ProductStatus::OutOfStock), "out_of_stock");
        assert_eq!(enum_from_text::<OrderStatus>("status", "shipped").unwrap(), OrderStatus::Shipped);
        assert!(matches!(
            enum_from_text::<OrderStatus>("status", "lost"),
            Err(RepositoryError::Corrupt { column: "status", .. })
        ));
    }

    #[test]
    fn test_page_defaults_and_bounds() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(0), Some(1000)), Page { page: 1, limit: 100 });
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(21), 3);
        assert_eq!(page.total_pages(0), 0);
    }

    #[test]
    fn test_qualified_columns() {
        assert_eq!(qualified("id, name,\n    email", "u"), "u.id, u.name, u.email");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" shirt "), "%shirt%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_counter_conversions() {
        assert_eq!(to_i32("stock", 5).unwrap(), 5);
        assert!(to_i32("stock", u32::MAX).is_err());
        assert!(to_u32("stock", -1).is_err());
    }
}
