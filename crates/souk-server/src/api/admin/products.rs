//! Product, variant, and attribute-value write handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souk_core::{validate_values, AttributeInput, ProductStatus};
use souk_db::{NewProduct, NewVariant, ProductRow, ProductUpdate, VariantRow};

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState};
use super::{missing_reference, require_name, require_slug};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateProductRequest {
    pub title: String,
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: ProductStatus,
}

fn default_status() -> ProductStatus {
    ProductStatus::Draft
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdateProductRequest {
    pub row_version: i64,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ReplaceAttributeValuesRequest {
    pub values: Vec<AttributeInput>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateVariantRequest {
    pub sku: String,
    pub title: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct ProductItem {
    id: i64,
    public_id: Uuid,
    brand_id: Option<i64>,
    category_id: Option<i64>,
    title: String,
    slug: String,
    description: Option<String>,
    status: String,
    view_count: i64,
    row_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductItem {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            brand_id: row.brand_id,
            category_id: row.category_id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            status: row.status,
            view_count: row.view_count,
            row_version: row.row_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct VariantItem {
    id: i64,
    public_id: Uuid,
    product_id: i64,
    sku: String,
    title: Option<String>,
    sort_order: i32,
    row_version: i64,
}

impl From<VariantRow> for VariantItem {
    fn from(row: VariantRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            product_id: row.product_id,
            sku: row.sku,
            title: row.title,
            sort_order: row.sort_order,
            row_version: row.row_version,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ReplaceAttributeValuesResponse {
    product_id: i64,
    written: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn require_live_category(
    state: &AppState,
    req_id: &str,
    category_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        souk_db::get_category(&state.pool, id)
            .await
            .map_err(|e| missing_reference(req_id, &format!("category {id}"), &e))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/products
pub(in crate::api) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let rid = &req_id.0;

    let title = require_name(rid, "title", &body.title)?;
    let slug = body
        .slug
        .map_or_else(|| souk_core::slug_from_name(&title), |s| s.trim().to_owned());
    require_slug(rid, &slug)?;
    require_live_category(&state, rid, body.category_id).await?;

    let row = souk_db::create_product(
        &state.pool,
        &NewProduct {
            brand_id: body.brand_id,
            category_id: body.category_id,
            title,
            slug,
            description: body.description,
            status: body.status,
        },
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    tracing::info!(product_id = row.id, slug = %row.slug, "product created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ProductItem::from(row), req_id.0.clone())),
    ))
}

/// PATCH /api/v1/admin/products/{id}: sparse update guarded by
/// `row_version`.
pub(in crate::api) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;

    let title = body
        .title
        .as_deref()
        .map(|t| require_name(rid, "title", t))
        .transpose()?;
    let slug = body.slug.as_deref().map(str::trim).map(str::to_owned);
    if let Some(ref s) = slug {
        require_slug(rid, s)?;
    }
    require_live_category(&state, rid, body.category_id).await?;

    let row = souk_db::update_product(
        &state.pool,
        id,
        body.row_version,
        &ProductUpdate {
            brand_id: body.brand_id,
            category_id: body.category_id,
            title,
            slug,
            description: body.description,
            status: body.status,
        },
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    Ok(Json(ApiResponse::new(
        ProductItem::from(row),
        req_id.0.clone(),
    )))
}

/// PUT /api/v1/admin/products/{id}/attribute-values: validate the full set
/// against the category's schema, then replace the stored values.
pub(in crate::api) async fn replace_attribute_values(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<ReplaceAttributeValuesRequest>,
) -> Result<Json<ApiResponse<ReplaceAttributeValuesResponse>>, ApiError> {
    let rid = &req_id.0;

    let product = souk_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid, &e))?;
    let Some(category_id) = product.category_id else {
        return Err(ApiError::validation(
            rid,
            "product has no category, so no attribute schema applies",
        ));
    };
    let schema = souk_db::load_schema_for_category(&state.pool, category_id)
        .await
        .map_err(|e| map_db_error(rid, &e))?
        .ok_or_else(|| {
            ApiError::validation(
                rid,
                format!("category {category_id} has no attribute set"),
            )
        })?;

    let variant_ids: Vec<i64> = souk_db::list_variants(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid, &e))?
        .iter()
        .map(|v| v.id)
        .collect();

    if let Err(issues) = validate_values(&schema, &body.values, &variant_ids) {
        return Err(ApiError::validation(
            rid,
            format!("{} attribute value issue(s)", issues.len()),
        )
        .with_details(serde_json::json!({ "issues": issues })));
    }

    let written = souk_db::replace_attribute_values(&state.pool, id, &body.values)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    tracing::info!(product_id = id, written, "attribute values replaced");

    Ok(Json(ApiResponse::new(
        ReplaceAttributeValuesResponse {
            product_id: id,
            written,
        },
        req_id.0.clone(),
    )))
}

/// POST /api/v1/admin/products/{id}/variants
pub(in crate::api) async fn create_variant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<CreateVariantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VariantItem>>), ApiError> {
    let rid = &req_id.0;

    let sku = require_name(rid, "sku", &body.sku)?;
    let row = souk_db::create_variant(
        &state.pool,
        id,
        &NewVariant {
            sku,
            title: body.title,
            sort_order: body.sort_order,
        },
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(VariantItem::from(row), req_id.0.clone())),
    ))
}
