use std::collections::HashMap;

use sqlx::PgPool;

use souk_core::{VendorOffer, VendorOfferVariant};

use super::types::{VendorOfferRow, VendorOfferVariantRow, OFFER_SELECT, OFFER_VARIANT_COLUMNS};
use crate::DbError;

/// Returns the live offers of a product from live, active vendors, each with
/// its live variant terms. Moderation status is not filtered here; the
/// buy-box rule does that.
///
/// # Errors
///
/// Returns [`DbError::InvalidRow`] if a stored enum value is unknown, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn list_offers_for_product(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<VendorOffer>, DbError> {
    let rows = sqlx::query_as::<_, VendorOfferRow>(&format!(
        "SELECT {OFFER_SELECT} \
         FROM vendor_offers o \
         JOIN vendors v ON v.id = o.vendor_id \
         WHERE o.product_id = $1 AND o.is_deleted = FALSE \
           AND v.is_deleted = FALSE AND v.is_active = TRUE \
         ORDER BY o.id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    attach_variants(pool, rows).await
}

/// Storefront lookup by product slug: offers of a live, active product.
/// An unknown or hidden product yields an empty list.
///
/// # Errors
///
/// Same as [`list_offers_for_product`].
pub async fn list_offers_by_product_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Vec<VendorOffer>, DbError> {
    let rows = sqlx::query_as::<_, VendorOfferRow>(&format!(
        "SELECT {OFFER_SELECT} \
         FROM vendor_offers o \
         JOIN vendors v ON v.id = o.vendor_id \
         JOIN products p ON p.id = o.product_id \
         WHERE p.slug = $1 AND p.is_deleted = FALSE AND p.status = 'active' \
           AND o.is_deleted = FALSE \
           AND v.is_deleted = FALSE AND v.is_active = TRUE \
         ORDER BY o.id"
    ))
    .bind(slug)
    .fetch_all(pool)
    .await?;

    attach_variants(pool, rows).await
}

/// Returns a live offer by id, including its moderation note.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live offer has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_offer(pool: &PgPool, id: i64) -> Result<VendorOfferRow, DbError> {
    sqlx::query_as::<_, VendorOfferRow>(&format!(
        "SELECT {OFFER_SELECT} \
         FROM vendor_offers o \
         JOIN vendors v ON v.id = o.vendor_id \
         WHERE o.id = $1 AND o.is_deleted = FALSE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

async fn attach_variants(
    pool: &PgPool,
    rows: Vec<VendorOfferRow>,
) -> Result<Vec<VendorOffer>, DbError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let offer_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let variant_rows = sqlx::query_as::<_, VendorOfferVariantRow>(&format!(
        "SELECT {OFFER_VARIANT_COLUMNS} \
         FROM vendor_offer_variants ov \
         JOIN product_variants pv ON pv.id = ov.variant_id \
         WHERE ov.vendor_offer_id = ANY($1) \
           AND ov.is_deleted = FALSE AND pv.is_deleted = FALSE \
         ORDER BY pv.sort_order, pv.id"
    ))
    .bind(&offer_ids)
    .fetch_all(pool)
    .await?;

    let mut by_offer: HashMap<i64, Vec<VendorOfferVariant>> = HashMap::new();
    for row in variant_rows {
        by_offer
            .entry(row.vendor_offer_id)
            .or_default()
            .push(VendorOfferVariant::try_from(row)?);
    }

    rows.into_iter()
        .map(|row| {
            let variants = by_offer.remove(&row.id).unwrap_or_default();
            row.into_offer(variants)
        })
        .collect()
}
