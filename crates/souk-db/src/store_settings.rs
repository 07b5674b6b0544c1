//! The single-row `store_settings` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use souk_core::{ContactFallback, StoreSeed, DEFAULT_CONTACT_LABEL};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreSettingsRow {
    pub store_name: String,
    pub currency_code: String,
    pub support_phone: Option<String>,
    pub contact_to_buy_label: String,
    pub updated_at: DateTime<Utc>,
    pub row_version: i64,
}

impl StoreSettingsRow {
    /// What the buy box shows when no offer is buyable.
    #[must_use]
    pub fn contact_fallback(&self) -> ContactFallback {
        ContactFallback {
            label: self.contact_to_buy_label.clone(),
            phone: self.support_phone.clone(),
        }
    }
}

/// Returns the store settings row, or `None` if it was never written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_store_settings(pool: &PgPool) -> Result<Option<StoreSettingsRow>, DbError> {
    let row = sqlx::query_as::<_, StoreSettingsRow>(
        "SELECT store_name, currency_code, support_phone, contact_to_buy_label, updated_at, \
                row_version \
         FROM store_settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Writes the store settings row, creating it if absent. An unset label
/// keeps the stored one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_store_settings<'e, E>(
    executor: E,
    store: &StoreSeed,
) -> Result<StoreSettingsRow, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, StoreSettingsRow>(
        "INSERT INTO store_settings \
             (id, store_name, currency_code, support_phone, contact_to_buy_label) \
         VALUES (1, $1, $2, $3, COALESCE($4, $5)) \
         ON CONFLICT (id) DO UPDATE SET \
             store_name           = EXCLUDED.store_name, \
             currency_code        = EXCLUDED.currency_code, \
             support_phone        = EXCLUDED.support_phone, \
             contact_to_buy_label = COALESCE($4, store_settings.contact_to_buy_label), \
             row_version          = store_settings.row_version + 1, \
             updated_at           = NOW() \
         RETURNING store_name, currency_code, support_phone, contact_to_buy_label, updated_at, \
                   row_version",
    )
    .bind(&store.name)
    .bind(&store.currency_code)
    .bind(&store.support_phone)
    .bind(&store.contact_to_buy_label)
    .bind(DEFAULT_CONTACT_LABEL)
    .fetch_one(executor)
    .await?;

    Ok(row)
}
