//! `admins` table.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{enum_from_text, enum_to_text, unique_public_id, unique_violation, RepositoryError};
use crate::domain::aggregates::{Admin, LoginRecord, Permission};
use crate::domain::value_objects::IdPrefix;

const COLUMNS: &str = "id, public_id, name, email, password_hash, role, permissions, status, last_login, \
    login_history, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: Uuid,
    public_id: Option<String>,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    permissions: Json<Vec<Permission>>,
    status: String,
    last_login: Option<DateTime<Utc>>,
    login_history: Json<Vec<LoginRecord>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: enum_from_text("role", &row.role)?,
            permissions: row.permissions.0,
            status: enum_from_text("status", &row.status)?,
            last_login: row.last_login,
            login_history: row.login_history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Admin>, RepositoryError> {
    sqlx::query_as::<_, AdminRow>(&format!("SELECT {COLUMNS} FROM admins WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Admin::try_from)
        .transpose()
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<Admin>, RepositoryError> {
    sqlx::query_as::<_, AdminRow>(&format!("SELECT {COLUMNS} FROM admins WHERE email = $1"))
        .bind(email)
        .fetch_optional(db)
        .await?
        .map(Admin::try_from)
        .transpose()
}

pub async fn insert(db: &PgPool, admin: &mut Admin) -> Result<(), RepositoryError> {
    if admin.public_id.is_none() {
        admin.public_id = Some(unique_public_id(db, IdPrefix::Admin, "admins", "public_id").await?);
    }
    sqlx::query(&format!("INSERT INTO admins ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"))
        .bind(admin.id)
        .bind(&admin.public_id)
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(enum_to_text(&admin.role))
        .bind(Json(&admin.permissions))
        .bind(enum_to_text(&admin.status))
        .bind(admin.last_login)
        .bind(Json(&admin.login_history))
        .bind(admin.created_at)
        .bind(admin.updated_at)
        .execute(db)
        .await
        .map_err(unique_violation("Admin"))?;
    tracing::info!(admin_id = %admin.id, role = ?admin.role, "admin created");
    Ok(())
}

pub async fn update(db: &PgPool, admin: &Admin) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE admins SET name = $2, email = $3, password_hash = $4, role = $5, permissions = $6, status = $7, \
         last_login = $8, login_history = $9, updated_at = $10 WHERE id = $1",
    )
    .bind(admin.id)
    .bind(&admin.name)
    .bind(&admin.email)
    .bind(&admin.password_hash)
    .bind(enum_to_text(&admin.role))
    .bind(Json(&admin.permissions))
    .bind(enum_to_text(&admin.status))
    .bind(admin.last_login)
    .bind(Json(&admin.login_history))
    .bind(admin.updated_at)
    .execute(db)
    .await
    .map_err(unique_violation("Admin"))?;
    Ok(result.rows_affected() > 0)
}
