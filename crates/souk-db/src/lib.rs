use std::collections::HashSet;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use souk_core::AppConfig;

/// Embedded from `<workspace-root>/migrations/`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_CHECK_VIOLATION: &str = "23514";

/// Connection pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    /// A `row_version` compare-and-increment matched no row although the
    /// row exists: someone else updated it first.
    #[error("{entity} {id} was modified concurrently (expected row_version {expected})")]
    Conflict {
        entity: &'static str,
        id: i64,
        expected: i64,
    },
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Integrity-constraint class of a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
    Check,
}

impl DbError {
    #[must_use]
    pub fn constraint_violation(&self) -> Option<ConstraintViolation> {
        let DbError::Sqlx(sqlx::Error::Database(db_err)) = self else {
            return None;
        };
        match db_err.code().as_deref() {
            Some(PG_UNIQUE_VIOLATION) => Some(ConstraintViolation::Unique),
            Some(PG_FOREIGN_KEY_VIOLATION) => Some(ConstraintViolation::ForeignKey),
            Some(PG_CHECK_VIOLATION) => Some(ConstraintViolation::Check),
            _ => None,
        }
    }
}

impl From<souk_core::CoreError> for DbError {
    fn from(err: souk_core::CoreError) -> Self {
        DbError::InvalidRow(err.to_string())
    }
}

/// Opens a Postgres pool sized by `config`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;
    tracing::debug!(
        max = config.max_connections,
        min = config.min_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Applies pending migrations and returns how many were new.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let already = applied_versions(pool).await;
    MIGRATOR.run(pool).await?;

    let fresh = MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration() && !already.contains(&m.version))
        .count();
    Ok(fresh)
}

/// Versions recorded as applied. A database that has never been migrated
/// has no bookkeeping table, which reads as an empty set.
async fn applied_versions(pool: &PgPool) -> HashSet<i64> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
        .map(|versions| versions.into_iter().collect())
        .unwrap_or_default()
}

/// Round-trips a trivial query.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the database does not answer.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// [`ping`] with the error lifted into [`DbError`], for the health route.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database does not answer.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    Ok(ping(pool).await?)
}

/// Resolve a versioned `UPDATE` that touched no rows into the right error:
/// [`DbError::NotFound`] when the live row is gone, [`DbError::Conflict`]
/// when it exists under a different `row_version`.
async fn versioned_update_miss<'e, E>(
    executor: E,
    table: &'static str,
    entity: &'static str,
    id: i64,
    expected: i64,
) -> DbError
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1 AND is_deleted = FALSE)");
    match sqlx::query_scalar::<_, bool>(&sql)
        .bind(id)
        .fetch_one(executor)
        .await
    {
        Ok(true) => DbError::Conflict {
            entity,
            id,
            expected,
        },
        Ok(false) => DbError::NotFound,
        Err(e) => DbError::Sqlx(e),
    }
}


pub mod attribute_values;
pub mod attributes;
pub mod brands;
pub mod categories;
pub mod offers;
pub mod products;
pub mod seed;
pub mod store_settings;
pub mod trash;
pub mod variants;
pub mod vendors;

pub use attribute_values::{list_stored_values, replace_attribute_values};
pub use attributes::{
    create_attribute_set, load_attribute_schema, load_schema_for_category, AttributeSetRow,
};
pub use brands::{create_brand, get_brand_by_slug, list_brands, BrandRow};
pub use categories::{
    create_category, get_category, list_categories, CategoryRow, NewCategory,
};
pub use offers::{
    create_offer, get_offer, list_offers_for_product, list_offers_by_product_slug,
    set_offer_status, update_offer, NewVendorOffer, NewVendorOfferVariant, OfferUpdate,
    VendorOfferRow, VendorOfferVariantRow,
};
pub use products::{
    create_product, get_product, get_public_product_by_slug, increment_view_count,
    update_product, NewProduct, ProductRow, ProductUpdate,
};
pub use seed::{seed_catalog, SeedSummary};
pub use store_settings::{get_store_settings, upsert_store_settings, StoreSettingsRow};
pub use trash::{
    hard_delete, list_trash, restore, soft_delete, TrashEntity, TrashedRow, UnknownTrashEntity,
};
pub use variants::{create_variant, list_variants, NewVariant, VariantRow};
pub use vendors::{create_vendor, get_vendor_by_slug, list_active_vendors, VendorRow};
