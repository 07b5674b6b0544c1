use std::collections::HashMap;

use sqlx::PgPool;

use souk_core::CatalogSeed;

use crate::attributes::write_set_contents;
use crate::store_settings::upsert_store_settings;
use crate::DbError;

/// Counts of rows processed by [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub brands: usize,
    pub vendors: usize,
    pub attribute_sets: usize,
    pub categories: usize,
    pub store_settings: bool,
}

/// Upsert a validated catalog seed into the database.
///
/// Rows are matched by slug (brands, vendors, categories) or name
/// (attribute sets) and updated in place, so the seed can be re-applied.
/// Re-seeding also revives soft-deleted matches. Everything runs in one
/// transaction; if any statement fails the whole seed is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, seed: &CatalogSeed) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for brand in &seed.brands {
        sqlx::query(
            "INSERT INTO brands (name, slug) VALUES ($1, $2) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 is_deleted = FALSE, \
                 deleted_at = NULL, \
                 updated_at = NOW()",
        )
        .bind(&brand.name)
        .bind(brand.slug())
        .execute(&mut *tx)
        .await?;
        summary.brands += 1;
    }

    for vendor in &seed.vendors {
        sqlx::query(
            "INSERT INTO vendors (name, slug) VALUES ($1, $2) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 is_deleted = FALSE, \
                 deleted_at = NULL, \
                 updated_at = NOW()",
        )
        .bind(&vendor.name)
        .bind(vendor.slug())
        .execute(&mut *tx)
        .await?;
        summary.vendors += 1;
    }

    let mut set_ids: HashMap<&str, i64> = HashMap::new();
    for set in &seed.attribute_sets {
        let set_id: i64 = sqlx::query_scalar(
            "INSERT INTO attribute_sets (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET \
                 is_deleted = FALSE, \
                 deleted_at = NULL, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&set.name)
        .fetch_one(&mut *tx)
        .await?;

        write_set_contents(&mut tx, set_id, set).await?;
        set_ids.insert(set.name.as_str(), set_id);
        summary.attribute_sets += 1;
    }

    // Parents always precede children in a validated seed.
    let mut category_ids: HashMap<String, i64> = HashMap::new();
    for (index, category) in seed.categories.iter().enumerate() {
        let parent_id = category
            .parent
            .as_ref()
            .and_then(|slug| category_ids.get(slug).copied());
        let attribute_set_id = category
            .attribute_set
            .as_deref()
            .and_then(|name| set_ids.get(name).copied());
        let slug = category.slug();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO catalog_categories (parent_id, attribute_set_id, name, slug, sort_order) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (slug) DO UPDATE SET \
                 parent_id        = EXCLUDED.parent_id, \
                 attribute_set_id = EXCLUDED.attribute_set_id, \
                 name             = EXCLUDED.name, \
                 sort_order       = EXCLUDED.sort_order, \
                 is_deleted       = FALSE, \
                 deleted_at       = NULL, \
                 updated_at       = NOW() \
             RETURNING id",
        )
        .bind(parent_id)
        .bind(attribute_set_id)
        .bind(&category.name)
        .bind(&slug)
        .bind(i32::try_from(index).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await?;

        category_ids.insert(slug, id);
        summary.categories += 1;
    }

    if let Some(store) = &seed.store {
        upsert_store_settings(&mut *tx, store).await?;
        summary.store_settings = true;
    }

    tx.commit().await?;
    tracing::info!(
        brands = summary.brands,
        vendors = summary.vendors,
        attribute_sets = summary.attribute_sets,
        categories = summary.categories,
        "catalog seed applied"
    );
    Ok(summary)
}
