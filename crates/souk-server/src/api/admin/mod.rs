//! Admin write API. Every route here sits behind bearer auth and the
//! rate limiter.
//!
//! - `POST  /api/v1/admin/products`, `PATCH /api/v1/admin/products/{id}`
//! - `PUT   /api/v1/admin/products/{id}/attribute-values`
//! - `POST  /api/v1/admin/products/{id}/variants`
//! - `POST  /api/v1/admin/offers`, `PATCH /api/v1/admin/offers/{id}`
//! - `PUT   /api/v1/admin/offers/{id}/status`
//! - `POST  /api/v1/admin/categories`, `POST /api/v1/admin/attribute-sets`
//! - trash: list, soft delete, restore, hard delete

pub(super) mod catalog;
pub(super) mod offers;
pub(super) mod products;
pub(super) mod trash;

use serde::{Deserialize, Deserializer};

use souk_db::DbError;

use super::{map_db_error, ApiError};

const MAX_NAME_LEN: usize = 200;

/// Maps a present JSON field to `Some`, so `null` becomes `Some(None)` and
/// an absent field stays `None` via `#[serde(default)]`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Trim `value` and require 1–200 characters.
fn require_name(req_id: &str, field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(
            req_id,
            format!("{field} must be 1-{MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

fn require_slug(req_id: &str, slug: &str) -> Result<(), ApiError> {
    if souk_core::is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ApiError::validation(
            req_id,
            format!("slug must be lowercase letters, digits, and single dashes, got '{slug}'"),
        ))
    }
}

/// A referenced row that is missing is the caller's mistake, not a 404 on
/// the route itself.
fn missing_reference(req_id: &str, what: &str, e: &DbError) -> ApiError {
    match e {
        DbError::NotFound => ApiError::validation(req_id, format!("{what} does not exist")),
        other => map_db_error(req_id, other),
    }
}
