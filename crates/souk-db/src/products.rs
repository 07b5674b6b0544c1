//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use souk_core::ProductStatus;

use crate::{versioned_update_miss, DbError};

/// A row from the `products` table.
///
/// `rating_average`, `rating_count`, `view_count`, and `sales_count` are
/// denormalized counters maintained outside the catalog write path.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub public_id: Uuid,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: String,
    pub rating_average: Decimal,
    pub rating_count: i32,
    pub view_count: i64,
    pub sales_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

impl ProductRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the stored status is unknown.
    pub fn status(&self) -> Result<ProductStatus, DbError> {
        Ok(self.status.parse()?)
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: ProductStatus,
}

/// Partial update; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
}

const PRODUCT_COLUMNS: &str = "id, public_id, brand_id, category_id, title, slug, description, \
                               status, rating_average, rating_count, view_count, sales_count, \
                               created_at, updated_at, is_deleted, deleted_at, row_version";

/// Creates a product and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (a taken slug is a unique
/// violation; an unknown brand or category a foreign-key violation).
pub async fn create_product(pool: &PgPool, new: &NewProduct) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (brand_id, category_id, title, slug, description, status) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(new.brand_id)
    .bind(new.category_id)
    .bind(&new.title)
    .bind(&new.slug)
    .bind(&new.description)
    .bind(new.status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies `update` if the live row is still at `expected_row_version`, and
/// bumps the version.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] on a version mismatch,
/// [`DbError::NotFound`] if no live product has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    expected_row_version: i64,
    update: &ProductUpdate,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET \
             brand_id    = COALESCE($3, brand_id), \
             category_id = COALESCE($4, category_id), \
             title       = COALESCE($5, title), \
             slug        = COALESCE($6, slug), \
             description = COALESCE($7, description), \
             status      = COALESCE($8, status), \
             row_version = row_version + 1, \
             updated_at  = NOW() \
         WHERE id = $1 AND row_version = $2 AND is_deleted = FALSE \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(expected_row_version)
    .bind(update.brand_id)
    .bind(update.category_id)
    .bind(&update.title)
    .bind(&update.slug)
    .bind(&update.description)
    .bind(update.status.map(ProductStatus::as_str))
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(row),
        None => {
            Err(versioned_update_miss(pool, "products", "product", id, expected_row_version).await)
        }
    }
}

/// Returns a live product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live product has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_deleted = FALSE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the storefront-visible product with this slug: live and active.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_public_product_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE slug = $1 AND is_deleted = FALSE AND status = 'active'"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Bumps `view_count` without touching `row_version`: counters are not
/// part of the admin edit conflict window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn increment_view_count(pool: &PgPool, id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE products SET view_count = view_count + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
