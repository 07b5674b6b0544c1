//! Database operations for the `product_variants` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `product_variants` table.
///
/// Pricing and stock moved to `vendor_offer_variants`; a variant only
/// identifies a sellable configuration of its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: i64,
    pub sku: String,
    pub title: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

#[derive(Debug, Clone)]
pub struct NewVariant {
    pub sku: String,
    pub title: Option<String>,
    pub sort_order: i32,
}

const VARIANT_COLUMNS: &str = "id, public_id, product_id, sku, title, sort_order, created_at, \
                               updated_at, is_deleted, deleted_at, row_version";

/// Creates a variant under a live product.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product is missing or deleted, or
/// [`DbError::Sqlx`] if the insert fails (a live duplicate SKU is a unique
/// violation).
pub async fn create_variant(
    pool: &PgPool,
    product_id: i64,
    new: &NewVariant,
) -> Result<VariantRow, DbError> {
    sqlx::query_as::<_, VariantRow>(&format!(
        "INSERT INTO product_variants (product_id, sku, title, sort_order) \
         SELECT id, $2, $3, $4 FROM products WHERE id = $1 AND is_deleted = FALSE \
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(&new.sku)
    .bind(&new.title)
    .bind(new.sort_order)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the live variants of a product ordered by `(sort_order, id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variants(pool: &PgPool, product_id: i64) -> Result<Vec<VariantRow>, DbError> {
    let rows = sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM product_variants \
         WHERE product_id = $1 AND is_deleted = FALSE \
         ORDER BY sort_order, id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
