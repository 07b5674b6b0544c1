//! Database operations for the `vendors` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `vendors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

const VENDOR_COLUMNS: &str = "id, public_id, name, slug, is_active, created_at, updated_at, \
                              is_deleted, deleted_at, row_version";

/// Returns all active, live vendors ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_vendors(pool: &PgPool) -> Result<Vec<VendorRow>, DbError> {
    let rows = sqlx::query_as::<_, VendorRow>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors \
         WHERE is_active = TRUE AND is_deleted = FALSE \
         ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a live vendor by slug regardless of `is_active`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_vendor_by_slug(pool: &PgPool, slug: &str) -> Result<Option<VendorRow>, DbError> {
    let row = sqlx::query_as::<_, VendorRow>(&format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors WHERE slug = $1 AND is_deleted = FALSE"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates an active vendor and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a taken slug).
pub async fn create_vendor(pool: &PgPool, name: &str, slug: &str) -> Result<VendorRow, DbError> {
    let row = sqlx::query_as::<_, VendorRow>(&format!(
        "INSERT INTO vendors (name, slug) VALUES ($1, $2) RETURNING {VENDOR_COLUMNS}"
    ))
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
