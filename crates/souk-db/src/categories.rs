//! Database operations for the `catalog_categories` tree.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use souk_core::CategoryNode;

use crate::DbError;

/// A row from the `catalog_categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub public_id: Uuid,
    pub parent_id: Option<i64>,
    pub attribute_set_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

impl From<&CategoryRow> for CategoryNode {
    fn from(row: &CategoryRow) -> Self {
        CategoryNode {
            id: row.id,
            parent_id: row.parent_id,
            name: row.name.clone(),
            slug: row.slug.clone(),
            attribute_set_id: row.attribute_set_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub parent_id: Option<i64>,
    pub attribute_set_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
}

const CATEGORY_COLUMNS: &str = "id, public_id, parent_id, attribute_set_id, name, slug, \
                                sort_order, created_at, updated_at, is_deleted, deleted_at, \
                                row_version";

/// Returns every live category ordered by `(sort_order, id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM catalog_categories \
         WHERE is_deleted = FALSE \
         ORDER BY sort_order, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a live category by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live category has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_category(pool: &PgPool, id: i64) -> Result<CategoryRow, DbError> {
    sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM catalog_categories WHERE id = $1 AND is_deleted = FALSE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Creates a category under an optional live parent.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if `parent_id` names no live category, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_category(pool: &PgPool, new: &NewCategory) -> Result<CategoryRow, DbError> {
    let mut tx = pool.begin().await?;

    if let Some(parent_id) = new.parent_id {
        let parent_live: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM catalog_categories WHERE id = $1 AND is_deleted = FALSE)",
        )
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await?;
        if !parent_live {
            return Err(DbError::NotFound);
        }
    }

    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "INSERT INTO catalog_categories (parent_id, attribute_set_id, name, slug, sort_order) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(new.parent_id)
    .bind(new.attribute_set_id)
    .bind(&new.name)
    .bind(&new.slug)
    .bind(new.sort_order)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Live categories as tree nodes, for breadcrumb and attribute-set lookups.
pub(crate) async fn list_category_nodes(pool: &PgPool) -> Result<Vec<CategoryNode>, DbError> {
    Ok(list_categories(pool)
        .await?
        .iter()
        .map(CategoryNode::from)
        .collect())
}
