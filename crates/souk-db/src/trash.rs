//! Soft delete, trash listing, restore, and hard delete across catalog
//! tables.
//!
//! Every catalog row is soft-deleted first. Hard delete only accepts rows
//! already in the trash, and restore only rows in the trash.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrashEntity {
    Brands,
    Vendors,
    Categories,
    Products,
    Variants,
    Offers,
    AttributeSets,
}

impl TrashEntity {
    pub const ALL: [TrashEntity; 7] = [
        TrashEntity::Brands,
        TrashEntity::Vendors,
        TrashEntity::Categories,
        TrashEntity::Products,
        TrashEntity::Variants,
        TrashEntity::Offers,
        TrashEntity::AttributeSets,
    ];

    /// The URL path segment naming this entity.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrashEntity::Brands => "brands",
            TrashEntity::Vendors => "vendors",
            TrashEntity::Categories => "categories",
            TrashEntity::Products => "products",
            TrashEntity::Variants => "variants",
            TrashEntity::Offers => "offers",
            TrashEntity::AttributeSets => "attribute-sets",
        }
    }

    fn table(self) -> &'static str {
        match self {
            TrashEntity::Brands => "brands",
            TrashEntity::Vendors => "vendors",
            TrashEntity::Categories => "catalog_categories",
            TrashEntity::Products => "products",
            TrashEntity::Variants => "product_variants",
            TrashEntity::Offers => "vendor_offers",
            TrashEntity::AttributeSets => "attribute_sets",
        }
    }

    /// SQL expression giving a human-readable label for a row of `t`.
    fn label_sql(self) -> &'static str {
        match self {
            TrashEntity::Brands
            | TrashEntity::Vendors
            | TrashEntity::Categories
            | TrashEntity::AttributeSets => "t.name",
            TrashEntity::Products => "t.title",
            TrashEntity::Variants => "t.sku",
            TrashEntity::Offers => {
                "(SELECT v.name FROM vendors v WHERE v.id = t.vendor_id) || ' / ' || \
                 (SELECT p.title FROM products p WHERE p.id = t.product_id)"
            }
        }
    }
}

impl fmt::Display for TrashEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity '{0}'")]
pub struct UnknownTrashEntity(pub String);

impl FromStr for TrashEntity {
    type Err = UnknownTrashEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrashEntity::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownTrashEntity(s.to_string()))
    }
}

/// A soft-deleted row as shown in the trash view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrashedRow {
    pub id: i64,
    pub public_id: Uuid,
    pub label: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Lists soft-deleted rows of `entity`, most recently deleted first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_trash(pool: &PgPool, entity: TrashEntity) -> Result<Vec<TrashedRow>, DbError> {
    let sql = format!(
        "SELECT t.id, t.public_id, {label} AS label, t.deleted_at \
         FROM {table} t \
         WHERE t.is_deleted = TRUE \
         ORDER BY t.deleted_at DESC NULLS LAST, t.id DESC",
        label = entity.label_sql(),
        table = entity.table(),
    );
    let rows = sqlx::query_as::<_, TrashedRow>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Moves a live row to the trash.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live row has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn soft_delete(pool: &PgPool, entity: TrashEntity, id: i64) -> Result<(), DbError> {
    let sql = format!(
        "UPDATE {} SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW(), \
                       row_version = row_version + 1 \
         WHERE id = $1 AND is_deleted = FALSE",
        entity.table()
    );
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    tracing::info!(entity = %entity, id, "moved to trash");
    Ok(())
}

/// Restores a row from the trash.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the row is not in the trash, or
/// [`DbError::Sqlx`] if the update fails (restoring a variant whose SKU was
/// reused by a live row is a unique violation).
pub async fn restore(pool: &PgPool, entity: TrashEntity, id: i64) -> Result<(), DbError> {
    let sql = format!(
        "UPDATE {} SET is_deleted = FALSE, deleted_at = NULL, updated_at = NOW(), \
                       row_version = row_version + 1 \
         WHERE id = $1 AND is_deleted = TRUE",
        entity.table()
    );
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    tracing::info!(entity = %entity, id, "restored from trash");
    Ok(())
}

/// Permanently deletes a row that is already in the trash. Dependent rows
/// follow the schema's cascade rules.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the row is not in the trash, or
/// [`DbError::Sqlx`] if the delete fails (a row still referenced under a
/// `RESTRICT` key is a foreign-key violation).
pub async fn hard_delete(pool: &PgPool, entity: TrashEntity, id: i64) -> Result<(), DbError> {
    let sql = format!(
        "DELETE FROM {} WHERE id = $1 AND is_deleted = TRUE",
        entity.table()
    );
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    tracing::warn!(entity = %entity, id, "permanently deleted");
    Ok(())
}
