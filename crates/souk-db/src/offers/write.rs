use sqlx::PgPool;

use souk_core::{BackorderPolicy, OfferStatus, StockStatus};

use super::types::{NewVendorOffer, OfferUpdate, VendorOfferRow, OFFER_SELECT};
use crate::{versioned_update_miss, DbError};

/// Creates a pending offer with its variant terms in one transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if a listed variant does not belong to the
/// offer's product (or is deleted), or [`DbError::Sqlx`] if an insert
/// fails (a second live offer from the same vendor is a unique violation).
pub async fn create_offer(pool: &PgPool, new: &NewVendorOffer) -> Result<VendorOfferRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, VendorOfferRow>(&format!(
        "WITH o AS ( \
             INSERT INTO vendor_offers \
                 (product_id, vendor_id, price, discount_price, currency_code, manage_stock, \
                  stock_quantity, stock_status, backorder_policy, low_stock_threshold, \
                  min_order_quantity, max_order_quantity, order_quantity_step, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING * \
         ) \
         SELECT {OFFER_SELECT} FROM o JOIN vendors v ON v.id = o.vendor_id"
    ))
    .bind(new.product_id)
    .bind(new.vendor_id)
    .bind(new.price)
    .bind(new.discount_price)
    .bind(&new.currency_code)
    .bind(new.manage_stock)
    .bind(new.stock_quantity)
    .bind(new.stock_status.as_str())
    .bind(new.backorder_policy.as_str())
    .bind(new.low_stock_threshold)
    .bind(new.min_order_quantity)
    .bind(new.max_order_quantity)
    .bind(new.order_quantity_step)
    .bind(OfferStatus::Pending.code())
    .fetch_one(&mut *tx)
    .await?;

    for variant in &new.variants {
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO vendor_offer_variants \
                 (vendor_offer_id, variant_id, sku, price, discount_price, manage_stock, \
                  stock_quantity, stock_status, low_stock_threshold, min_order_quantity, \
                  max_order_quantity, order_quantity_step) \
             SELECT $1, pv.id, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12 \
             FROM product_variants pv \
             WHERE pv.id = $2 AND pv.product_id = $13 AND pv.is_deleted = FALSE \
             RETURNING id",
        )
        .bind(row.id)
        .bind(variant.variant_id)
        .bind(&variant.sku)
        .bind(variant.price)
        .bind(variant.discount_price)
        .bind(variant.manage_stock)
        .bind(variant.stock_quantity)
        .bind(variant.stock_status.as_str())
        .bind(variant.low_stock_threshold)
        .bind(variant.min_order_quantity)
        .bind(variant.max_order_quantity)
        .bind(variant.order_quantity_step)
        .bind(new.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Err(DbError::NotFound);
        }
    }

    tx.commit().await?;
    tracing::info!(
        offer_id = row.id,
        product_id = row.product_id,
        vendor_id = row.vendor_id,
        variants = new.variants.len(),
        "vendor offer created"
    );
    Ok(row)
}

/// Applies `update` if the live offer is still at `expected_row_version`.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] on a version mismatch,
/// [`DbError::NotFound`] if no live offer has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_offer(
    pool: &PgPool,
    id: i64,
    expected_row_version: i64,
    update: &OfferUpdate,
) -> Result<VendorOfferRow, DbError> {
    let row = sqlx::query_as::<_, VendorOfferRow>(&format!(
        "WITH o AS ( \
             UPDATE vendor_offers SET \
                 price               = COALESCE($3, price), \
                 discount_price      = CASE WHEN $5 THEN NULL \
                                            ELSE COALESCE($4, discount_price) END, \
                 currency_code       = COALESCE($6, currency_code), \
                 manage_stock        = COALESCE($7, manage_stock), \
                 stock_quantity      = COALESCE($8, stock_quantity), \
                 stock_status        = COALESCE($9, stock_status), \
                 backorder_policy    = COALESCE($10, backorder_policy), \
                 low_stock_threshold = COALESCE($11, low_stock_threshold), \
                 min_order_quantity  = COALESCE($12, min_order_quantity), \
                 max_order_quantity  = COALESCE($13, max_order_quantity), \
                 order_quantity_step = COALESCE($14, order_quantity_step), \
                 row_version         = row_version + 1, \
                 updated_at          = NOW() \
             WHERE id = $1 AND row_version = $2 AND is_deleted = FALSE \
             RETURNING * \
         ) \
         SELECT {OFFER_SELECT} FROM o JOIN vendors v ON v.id = o.vendor_id"
    ))
    .bind(id)
    .bind(expected_row_version)
    .bind(update.price)
    .bind(update.discount_price)
    .bind(update.clear_discount_price)
    .bind(&update.currency_code)
    .bind(update.manage_stock)
    .bind(update.stock_quantity)
    .bind(update.stock_status.map(StockStatus::as_str))
    .bind(update.backorder_policy.map(BackorderPolicy::as_str))
    .bind(update.low_stock_threshold)
    .bind(update.min_order_quantity)
    .bind(update.max_order_quantity)
    .bind(update.order_quantity_step)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(row),
        None => Err(
            versioned_update_miss(pool, "vendor_offers", "offer", id, expected_row_version).await,
        ),
    }
}

/// Moderates an offer: sets its status and note under the same
/// `row_version` check as other edits.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] on a version mismatch,
/// [`DbError::NotFound`] if no live offer has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn set_offer_status(
    pool: &PgPool,
    id: i64,
    expected_row_version: i64,
    status: OfferStatus,
    moderation_note: Option<&str>,
) -> Result<VendorOfferRow, DbError> {
    let row = sqlx::query_as::<_, VendorOfferRow>(&format!(
        "WITH o AS ( \
             UPDATE vendor_offers SET \
                 status          = $3, \
                 moderation_note = $4, \
                 row_version     = row_version + 1, \
                 updated_at      = NOW() \
             WHERE id = $1 AND row_version = $2 AND is_deleted = FALSE \
             RETURNING * \
         ) \
         SELECT {OFFER_SELECT} FROM o JOIN vendors v ON v.id = o.vendor_id"
    ))
    .bind(id)
    .bind(expected_row_version)
    .bind(status.code())
    .bind(moderation_note)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            tracing::info!(offer_id = id, status = %status, "offer moderated");
            Ok(row)
        }
        None => Err(
            versioned_update_miss(pool, "vendor_offers", "offer", id, expected_row_version).await,
        ),
    }
}
