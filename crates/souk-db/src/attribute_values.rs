//! Database operations for `product_attribute_values`.

use sqlx::PgPool;

use souk_core::{AttributeInput, StoredAttributeRow, StoredAttributeValue};

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct ValueRow {
    attribute_id: i64,
    variant_id: Option<i64>,
    raw_value: Option<String>,
    numeric_value: Option<rust_decimal::Decimal>,
    bool_value: Option<bool>,
    datetime_value: Option<chrono::DateTime<chrono::Utc>>,
    option_id: Option<i64>,
}

impl From<ValueRow> for StoredAttributeRow {
    fn from(row: ValueRow) -> Self {
        StoredAttributeRow {
            attribute_id: row.attribute_id,
            variant_id: row.variant_id,
            stored: StoredAttributeValue {
                raw_value: row.raw_value,
                numeric_value: row.numeric_value,
                bool_value: row.bool_value,
                datetime_value: row.datetime_value,
                option_id: row.option_id,
            },
        }
    }
}

/// Replaces every attribute value of a product with `inputs`, in one
/// transaction. Values belong to the product and are not kept in the trash.
///
/// Callers validate `inputs` against the product's schema first; the
/// database still enforces the one-populated-column check.
///
/// Returns the number of values written.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product is missing or deleted, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn replace_attribute_values(
    pool: &PgPool,
    product_id: i64,
    inputs: &[AttributeInput],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    // Lock the product row so concurrent replacements serialize.
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM products WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?;
    if exists.is_none() {
        return Err(DbError::NotFound);
    }

    // Values of trashed variants stay put so a restore brings them back.
    sqlx::query(
        "DELETE FROM product_attribute_values \
         WHERE product_id = $1 \
           AND (variant_id IS NULL OR variant_id IN ( \
                SELECT id FROM product_variants \
                WHERE product_id = $1 AND is_deleted = FALSE))",
    )
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    for input in inputs {
        let stored = input.value.to_stored();
        sqlx::query(
            "INSERT INTO product_attribute_values \
                 (product_id, variant_id, attribute_id, raw_value, numeric_value, bool_value, \
                  datetime_value, option_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(product_id)
        .bind(input.variant_id)
        .bind(input.attribute_id)
        .bind(&stored.raw_value)
        .bind(stored.numeric_value)
        .bind(stored.bool_value)
        .bind(stored.datetime_value)
        .bind(stored.option_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(product_id, count = inputs.len(), "replaced attribute values");
    Ok(inputs.len())
}

/// Returns the live stored values of a product. Values attached to deleted
/// variants are left out.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stored_values(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<StoredAttributeRow>, DbError> {
    let rows = sqlx::query_as::<_, ValueRow>(
        "SELECT v.attribute_id, v.variant_id, v.raw_value, v.numeric_value, v.bool_value, \
                v.datetime_value, v.option_id \
         FROM product_attribute_values v \
         LEFT JOIN product_variants pv ON pv.id = v.variant_id \
         WHERE v.product_id = $1 AND v.is_deleted = FALSE \
           AND (v.variant_id IS NULL OR pv.is_deleted = FALSE) \
         ORDER BY v.id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StoredAttributeRow::from).collect())
}
