//! Vendor offer write handlers: create, edit commercial terms, moderate.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souk_core::{BackorderPolicy, OfferStatus, StockStatus};
use souk_db::{NewVendorOffer, NewVendorOfferVariant, OfferUpdate, VendorOfferRow};

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState};
use super::{deserialize_some, missing_reference};

const FALLBACK_CURRENCY: &str = "USD";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateOfferVariantRequest {
    pub variant_id: i64,
    pub sku: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    #[serde(default = "default_stock_status")]
    pub stock_status: StockStatus,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateOfferRequest {
    pub product_id: i64,
    pub vendor_id: i64,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    /// Defaults to the store currency.
    pub currency_code: Option<String>,
    #[serde(default)]
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    #[serde(default = "default_stock_status")]
    pub stock_status: StockStatus,
    #[serde(default = "default_backorder_policy")]
    pub backorder_policy: BackorderPolicy,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
    #[serde(default)]
    pub variants: Vec<CreateOfferVariantRequest>,
}

fn default_stock_status() -> StockStatus {
    StockStatus::InStock
}

fn default_backorder_policy() -> BackorderPolicy {
    BackorderPolicy::NotAllowed
}

// Option<Option<T>> on discount_price: absent keeps the discount, `null`
// clears it, a value replaces it.
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdateOfferRequest {
    pub row_version: i64,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub discount_price: Option<Option<Decimal>>,
    pub currency_code: Option<String>,
    pub manage_stock: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub stock_status: Option<StockStatus>,
    pub backorder_policy: Option<BackorderPolicy>,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ModerateOfferRequest {
    pub row_version: i64,
    /// Accepts the numeric code or the status name.
    pub status: OfferStatus,
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct OfferItem {
    id: i64,
    public_id: Uuid,
    product_id: i64,
    vendor_id: i64,
    vendor_name: String,
    price: Decimal,
    discount_price: Option<Decimal>,
    currency_code: String,
    manage_stock: bool,
    stock_quantity: Option<i32>,
    stock_status: String,
    backorder_policy: String,
    min_order_quantity: Option<i32>,
    max_order_quantity: Option<i32>,
    order_quantity_step: Option<i32>,
    status: i16,
    status_name: Option<&'static str>,
    moderation_note: Option<String>,
    row_version: i64,
    updated_at: DateTime<Utc>,
}

impl From<VendorOfferRow> for OfferItem {
    fn from(row: VendorOfferRow) -> Self {
        Self {
            status_name: OfferStatus::from_code(i64::from(row.status))
                .ok()
                .map(OfferStatus::as_str),
            id: row.id,
            public_id: row.public_id,
            product_id: row.product_id,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            price: row.price,
            discount_price: row.discount_price,
            currency_code: row.currency_code,
            manage_stock: row.manage_stock,
            stock_quantity: row.stock_quantity,
            stock_status: row.stock_status,
            backorder_policy: row.backorder_policy,
            min_order_quantity: row.min_order_quantity,
            max_order_quantity: row.max_order_quantity,
            order_quantity_step: row.order_quantity_step,
            status: row.status,
            moderation_note: row.moderation_note,
            row_version: row.row_version,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Price and quantity fields shared by offers and offer variants.
#[derive(Debug, Default, Clone, Copy)]
struct Terms {
    price: Option<Decimal>,
    discount_price: Option<Decimal>,
    stock_quantity: Option<i32>,
    low_stock_threshold: Option<i32>,
    min_order_quantity: Option<i32>,
    max_order_quantity: Option<i32>,
    order_quantity_step: Option<i32>,
}

fn validate_terms(req_id: &str, scope: &str, terms: Terms) -> Result<(), ApiError> {
    let fail = |msg: String| -> Result<(), ApiError> {
        Err(ApiError::validation(req_id, format!("{scope}: {msg}")))
    };

    if terms.price.is_some_and(|p| p < Decimal::ZERO) {
        return fail("price must not be negative".to_string());
    }
    if terms.discount_price.is_some_and(|d| d < Decimal::ZERO) {
        return fail("discount_price must not be negative".to_string());
    }
    for (field, value) in [
        ("stock_quantity", terms.stock_quantity),
        ("low_stock_threshold", terms.low_stock_threshold),
        ("min_order_quantity", terms.min_order_quantity),
        ("max_order_quantity", terms.max_order_quantity),
    ] {
        if value.is_some_and(|v| v < 0) {
            return fail(format!("{field} must not be negative"));
        }
    }
    if terms.order_quantity_step.is_some_and(|s| s <= 0) {
        return fail("order_quantity_step must be positive".to_string());
    }
    if let Some(max) = terms.max_order_quantity {
        let min = souk_core::effective_min_order_quantity(terms.min_order_quantity);
        if max < min {
            return fail(format!(
                "max_order_quantity {max} is below min_order_quantity {min}"
            ));
        }
    }
    Ok(())
}

fn normalize_currency(req_id: &str, code: &str) -> Result<String, ApiError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ApiError::validation(
            req_id,
            format!("currency_code must be a three-letter ISO code, got '{code}'"),
        ))
    }
}

async fn store_currency(state: &AppState, req_id: &str) -> Result<String, ApiError> {
    let settings = souk_db::get_store_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id, &e))?;
    Ok(settings.map_or_else(|| FALLBACK_CURRENCY.to_string(), |s| s.currency_code))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/offers: new offers start pending moderation.
pub(in crate::api) async fn create_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OfferItem>>), ApiError> {
    let rid = &req_id.0;

    validate_terms(
        rid,
        "offer",
        Terms {
            price: Some(body.price),
            discount_price: body.discount_price,
            stock_quantity: body.stock_quantity,
            low_stock_threshold: body.low_stock_threshold,
            min_order_quantity: body.min_order_quantity,
            max_order_quantity: body.max_order_quantity,
            order_quantity_step: body.order_quantity_step,
        },
    )?;
    for variant in &body.variants {
        validate_terms(
            rid,
            &format!("variant {}", variant.variant_id),
            Terms {
                price: Some(variant.price),
                discount_price: variant.discount_price,
                stock_quantity: variant.stock_quantity,
                low_stock_threshold: variant.low_stock_threshold,
                min_order_quantity: variant.min_order_quantity,
                max_order_quantity: variant.max_order_quantity,
                order_quantity_step: variant.order_quantity_step,
            },
        )?;
    }

    let currency_code = match body.currency_code.as_deref() {
        Some(code) => normalize_currency(rid, code)?,
        None => store_currency(&state, rid).await?,
    };

    souk_db::get_product(&state.pool, body.product_id)
        .await
        .map_err(|e| missing_reference(rid, &format!("product {}", body.product_id), &e))?;

    let new = NewVendorOffer {
        product_id: body.product_id,
        vendor_id: body.vendor_id,
        price: body.price,
        discount_price: body.discount_price,
        currency_code,
        manage_stock: body.manage_stock,
        stock_quantity: body.stock_quantity,
        stock_status: body.stock_status,
        backorder_policy: body.backorder_policy,
        low_stock_threshold: body.low_stock_threshold,
        min_order_quantity: body.min_order_quantity,
        max_order_quantity: body.max_order_quantity,
        order_quantity_step: body.order_quantity_step,
        variants: body
            .variants
            .into_iter()
            .map(|v| NewVendorOfferVariant {
                variant_id: v.variant_id,
                sku: v.sku,
                price: v.price,
                discount_price: v.discount_price,
                manage_stock: v.manage_stock,
                stock_quantity: v.stock_quantity,
                stock_status: v.stock_status,
                low_stock_threshold: v.low_stock_threshold,
                min_order_quantity: v.min_order_quantity,
                max_order_quantity: v.max_order_quantity,
                order_quantity_step: v.order_quantity_step,
            })
            .collect(),
    };

    // A variant that does not belong to the product surfaces as NotFound.
    let row = souk_db::create_offer(&state.pool, &new)
        .await
        .map_err(|e| missing_reference(rid, "variant on this product", &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(OfferItem::from(row), req_id.0.clone())),
    ))
}

/// PATCH /api/v1/admin/offers/{id}: edit commercial terms.
pub(in crate::api) async fn update_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateOfferRequest>,
) -> Result<Json<ApiResponse<OfferItem>>, ApiError> {
    let rid = &req_id.0;

    validate_terms(
        rid,
        "offer",
        Terms {
            price: body.price,
            discount_price: body.discount_price.flatten(),
            stock_quantity: body.stock_quantity,
            low_stock_threshold: body.low_stock_threshold,
            min_order_quantity: body.min_order_quantity,
            max_order_quantity: body.max_order_quantity,
            order_quantity_step: body.order_quantity_step,
        },
    )?;
    let currency_code = body
        .currency_code
        .as_deref()
        .map(|c| normalize_currency(rid, c))
        .transpose()?;

    let update = OfferUpdate {
        price: body.price,
        discount_price: body.discount_price.flatten(),
        clear_discount_price: matches!(body.discount_price, Some(None)),
        currency_code,
        manage_stock: body.manage_stock,
        stock_quantity: body.stock_quantity,
        stock_status: body.stock_status,
        backorder_policy: body.backorder_policy,
        low_stock_threshold: body.low_stock_threshold,
        min_order_quantity: body.min_order_quantity,
        max_order_quantity: body.max_order_quantity,
        order_quantity_step: body.order_quantity_step,
    };

    let row = souk_db::update_offer(&state.pool, id, body.row_version, &update)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    Ok(Json(ApiResponse::new(OfferItem::from(row), req_id.0.clone())))
}

/// PUT /api/v1/admin/offers/{id}/status: moderation.
pub(in crate::api) async fn moderate_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<ModerateOfferRequest>,
) -> Result<Json<ApiResponse<OfferItem>>, ApiError> {
    let rid = &req_id.0;

    let note = body
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let row = souk_db::set_offer_status(&state.pool, id, body.row_version, body.status, note)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    tracing::info!(offer_id = id, status = %body.status, "offer moderated");

    Ok(Json(ApiResponse::new(OfferItem::from(row), req_id.0.clone())))
}
