//! `categories` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{enum_from_text, enum_to_text, unique_violation, RepositoryError};
use crate::domain::aggregates::Category;

const COLUMNS: &str = "id, name, description, slug, parent_id, icon, image, banner_image, status, sort_order, \
    created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    slug: String,
    parent_id: Option<Uuid>,
    icon: Option<String>,
    image: Option<String>,
    banner_image: Option<String>,
    status: String,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            slug: row.slug,
            parent_id: row.parent_id,
            icon: row.icon,
            image: row.image,
            banner_image: row.banner_image,
            status: enum_from_text("status", &row.status)?,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Ordered by sort order, then name.
pub async fn list(db: &PgPool) -> Result<Vec<Category>, RepositoryError> {
    sqlx::query_as::<_, CategoryRow>(&format!("SELECT {COLUMNS} FROM categories ORDER BY sort_order, name"))
        .fetch_all(db)
        .await?
        .into_iter()
        .map(Category::try_from)
        .collect()
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Category>, RepositoryError> {
    sqlx::query_as::<_, CategoryRow>(&format!("SELECT {COLUMNS} FROM categories WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Category::try_from)
        .transpose()
}

pub async fn insert(db: &PgPool, category: &Category) -> Result<(), RepositoryError> {
    sqlx::query(&format!("INSERT INTO categories ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.slug)
        .bind(category.parent_id)
        .bind(&category.icon)
        .bind(&category.image)
        .bind(&category.banner_image)
        .bind(enum_to_text(&category.status))
        .bind(category.sort_order)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(db)
        .await
        .map_err(unique_violation("Category"))?;
    Ok(())
}

pub async fn update(db: &PgPool, category: &Category) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE categories SET name = $2, description = $3, slug = $4, parent_id = $5, icon = $6, image = $7, \
         banner_image = $8, status = $9, sort_order = $10, updated_at = $11 WHERE id = $1",
    )
    .bind(category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(&category.slug)
    .bind(category.parent_id)
    .bind(&category.icon)
    .bind(&category.image)
    .bind(&category.banner_image)
    .bind(enum_to_text(&category.status))
    .bind(category.sort_order)
    .bind(category.updated_at)
    .execute(db)
    .await
    .map_err(unique_violation("Category"))?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
