//! Database operations for the `brands` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

const BRAND_COLUMNS: &str =
    "id, public_id, name, slug, created_at, updated_at, is_deleted, deleted_at, row_version";

/// Returns all live brands, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands(pool: &PgPool) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE is_deleted = FALSE ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single live brand by slug, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_by_slug(pool: &PgPool, slug: &str) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE slug = $1 AND is_deleted = FALSE"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a brand and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a taken slug).
pub async fn create_brand(pool: &PgPool, name: &str, slug: &str) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "INSERT INTO brands (name, slug) VALUES ($1, $2) RETURNING {BRAND_COLUMNS}"
    ))
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
