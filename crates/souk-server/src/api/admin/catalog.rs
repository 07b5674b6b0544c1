//! Category and attribute-set write handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souk_core::{AttributeSchema, AttributeSetSeed};
use souk_db::{CategoryRow, NewCategory};

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState};
use super::{missing_reference, require_name, require_slug};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub parent_id: Option<i64>,
    pub attribute_set_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct CategoryItem {
    id: i64,
    public_id: Uuid,
    parent_id: Option<i64>,
    attribute_set_id: Option<i64>,
    name: String,
    slug: String,
    sort_order: i32,
    row_version: i64,
}

impl From<CategoryRow> for CategoryItem {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            parent_id: row.parent_id,
            attribute_set_id: row.attribute_set_id,
            name: row.name,
            slug: row.slug,
            sort_order: row.sort_order,
            row_version: row.row_version,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct AttributeSetItem {
    id: i64,
    public_id: Uuid,
    schema: Option<AttributeSchema>,
}

/// POST /api/v1/admin/categories
pub(in crate::api) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryItem>>), ApiError> {
    let rid = &req_id.0;

    let name = require_name(rid, "name", &body.name)?;
    let slug = body
        .slug
        .map_or_else(|| souk_core::slug_from_name(&name), |s| s.trim().to_owned());
    require_slug(rid, &slug)?;

    if let Some(set_id) = body.attribute_set_id {
        let schema = souk_db::load_attribute_schema(&state.pool, set_id)
            .await
            .map_err(|e| map_db_error(rid, &e))?;
        if schema.is_none() {
            return Err(ApiError::validation(
                rid,
                format!("attribute set {set_id} does not exist"),
            ));
        }
    }

    let row = souk_db::create_category(
        &state.pool,
        &NewCategory {
            parent_id: body.parent_id,
            attribute_set_id: body.attribute_set_id,
            name,
            slug,
            sort_order: body.sort_order,
        },
    )
    .await
    .map_err(|e| missing_reference(rid, "parent category", &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CategoryItem::from(row), req_id.0.clone())),
    ))
}

/// POST /api/v1/admin/attribute-sets: body has the same shape as an entry
/// under `attribute_sets:` in the catalog seed file.
pub(in crate::api) async fn create_attribute_set(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AttributeSetSeed>,
) -> Result<(StatusCode, Json<ApiResponse<AttributeSetItem>>), ApiError> {
    let rid = &req_id.0;

    body.validate()
        .map_err(|e| ApiError::validation(rid, e.to_string()))?;

    let row = souk_db::create_attribute_set(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(rid, &e))?;
    let schema = souk_db::load_attribute_schema(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    tracing::info!(attribute_set_id = row.id, name = %row.name, "attribute set created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            AttributeSetItem {
                id: row.id,
                public_id: row.public_id,
                schema,
            },
            req_id.0.clone(),
        )),
    ))
}
