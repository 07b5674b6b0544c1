//! Public storefront reads: offers, buy box, attributes, and store settings.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use souk_core::{
    category_path, resolve_values, select_best_offer, AttributeSchema, BuyBox, ContactFallback,
    CategoryNode, OfferTerms, OrderQuantityPolicy, ResolvedAttributeValue, VendorOffer,
};
use souk_db::{DbError, ProductRow, StoreSettingsRow};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct PublicOfferItem {
    offer_id: i64,
    vendor_name: String,
    vendor_slug: String,
    currency_code: String,
    price: Decimal,
    discount_price: Option<Decimal>,
    effective_price: Decimal,
    quantity: OrderQuantityPolicy,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductOffersData {
    product_id: i64,
    product_slug: String,
    /// Buyable offers, cheapest first.
    offers: Vec<PublicOfferItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct BuyBoxData {
    product_id: i64,
    product_slug: String,
    variant_id: Option<i64>,
    can_add_to_cart: bool,
    other_offers_count: usize,
    #[serde(flatten)]
    buy_box: BuyBox,
}

#[derive(Debug, Serialize)]
pub(super) struct CategoryCrumb {
    id: i64,
    name: String,
    slug: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductAttributesData {
    product_id: i64,
    category_path: Vec<CategoryCrumb>,
    attributes: Vec<ResolvedAttributeValue>,
}

#[derive(Debug, Serialize)]
pub(super) struct CategoryAttributesData {
    category_id: i64,
    category_path: Vec<CategoryCrumb>,
    /// `None` when no category on the path carries an attribute set.
    schema: Option<AttributeSchema>,
}

#[derive(Debug, Serialize)]
pub(super) struct StoreSettingsData {
    store_name: String,
    currency_code: String,
    support_phone: Option<String>,
    contact_to_buy_label: String,
}

impl From<StoreSettingsRow> for StoreSettingsData {
    fn from(row: StoreSettingsRow) -> Self {
        Self {
            store_name: row.store_name,
            currency_code: row.currency_code,
            support_phone: row.support_phone,
            contact_to_buy_label: row.contact_to_buy_label,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BuyBoxQuery {
    pub variant_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn public_product(state: &AppState, rid: &str, slug: &str) -> Result<ProductRow, ApiError> {
    souk_db::get_public_product_by_slug(&state.pool, slug)
        .await
        .map_err(|e| map_db_error(rid, &e))?
        .ok_or_else(|| ApiError::not_found(rid, format!("product '{slug}' not found")))
}

async fn crumbs(
    state: &AppState,
    rid: &str,
    category_id: i64,
) -> Result<Vec<CategoryCrumb>, ApiError> {
    let rows = souk_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(rid, &e))?;
    let nodes: Vec<CategoryNode> = rows.iter().map(CategoryNode::from).collect();
    Ok(category_path(&nodes, category_id)
        .into_iter()
        .map(|n| CategoryCrumb {
            id: n.id,
            name: n.name.clone(),
            slug: n.slug.clone(),
        })
        .collect())
}

fn offer_item(offer: &VendorOffer) -> PublicOfferItem {
    PublicOfferItem {
        offer_id: offer.id,
        vendor_name: offer.vendor_name.clone(),
        vendor_slug: offer.vendor_slug.clone(),
        currency_code: offer.currency_code.clone(),
        price: offer.price,
        discount_price: offer.discount_price,
        effective_price: offer.effective_price(),
        quantity: OrderQuantityPolicy::from_bounds(
            offer.min_order_quantity,
            offer.max_order_quantity,
            offer.order_quantity_step,
        ),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/public/products/{slug}/offers: buyable offers, cheapest first.
pub(super) async fn product_offers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductOffersData>>, ApiError> {
    let rid = &req_id.0;
    let product = public_product(&state, rid, &slug).await?;

    let offers = souk_db::list_offers_for_product(&state.pool, product.id)
        .await
        .map_err(|e| map_db_error(rid, &e))?;
    let selection = select_best_offer(&offers);

    Ok(Json(ApiResponse::new(
        ProductOffersData {
            product_id: product.id,
            product_slug: product.slug,
            offers: selection.buyable.iter().copied().map(offer_item).collect(),
        },
        req_id.0.clone(),
    )))
}

/// GET /api/v1/public/products/{slug}/buy-box: the product-detail buy box.
///
/// Offer and settings failures degrade to the unavailable state and the
/// default contact label rather than failing the page.
pub(super) async fn product_buy_box(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<BuyBoxQuery>,
) -> Result<Json<ApiResponse<BuyBoxData>>, ApiError> {
    let rid = &req_id.0;
    let product = public_product(&state, rid, &slug).await?;

    if let Err(e) = souk_db::increment_view_count(&state.pool, product.id).await {
        tracing::warn!(error = %e, product_id = product.id, "failed to count product view");
    }

    let offers = match souk_db::list_offers_for_product(&state.pool, product.id).await {
        Ok(offers) => offers,
        Err(e) => {
            tracing::warn!(
                error = %e,
                product_id = product.id,
                "offer fetch failed; rendering without offers"
            );
            Vec::new()
        }
    };

    let fallback = match souk_db::get_store_settings(&state.pool).await {
        Ok(Some(settings)) => settings.contact_fallback(),
        Ok(None) => ContactFallback::default(),
        Err(e) => {
            tracing::warn!(error = %e, "store settings fetch failed; using default contact label");
            ContactFallback::default()
        }
    };

    let buy_box = match query.variant_id {
        Some(variant_id) => BuyBox::for_variant(&offers, variant_id, fallback),
        None => BuyBox::for_product(&offers, fallback),
    };

    let other_offers_count = buy_box.other_offers_count();
    tracing::debug!(
        product_id = product.id,
        candidates = offers.len(),
        buyable = if buy_box.can_add_to_cart() {
            other_offers_count + 1
        } else {
            0
        },
        "buy box computed"
    );
    if let Some(best) = buy_box.best_offer().filter(|b| b.discount_exceeds_price) {
        tracing::warn!(
            offer_id = best.offer_id,
            price = %best.price,
            discount_price = ?best.discount_price,
            "best offer discount is not below its price"
        );
    }

    Ok(Json(ApiResponse::new(
        BuyBoxData {
            product_id: product.id,
            product_slug: product.slug,
            variant_id: query.variant_id,
            can_add_to_cart: buy_box.can_add_to_cart(),
            other_offers_count,
            buy_box,
        },
        req_id.0.clone(),
    )))
}

/// GET /api/v1/public/products/{slug}/attributes: resolved specification
/// values in schema display order.
pub(super) async fn product_attributes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductAttributesData>>, ApiError> {
    let rid = &req_id.0;
    let product = public_product(&state, rid, &slug).await?;

    let Some(category_id) = product.category_id else {
        return Ok(Json(ApiResponse::new(
            ProductAttributesData {
                product_id: product.id,
                category_path: Vec::new(),
                attributes: Vec::new(),
            },
            req_id.0.clone(),
        )));
    };

    // A trashed category leaves the product without a schema.
    let schema = match souk_db::load_schema_for_category(&state.pool, category_id).await {
        Ok(schema) => schema,
        Err(DbError::NotFound) => None,
        Err(e) => return Err(map_db_error(rid, &e)),
    };
    let attributes = match schema {
        Some(schema) => {
            let stored = souk_db::list_stored_values(&state.pool, product.id)
                .await
                .map_err(|e| map_db_error(rid, &e))?;
            let resolved = resolve_values(&schema, &stored);
            for skipped in &resolved.skipped {
                tracing::warn!(
                    product_id = product.id,
                    attribute_id = skipped.attribute_id,
                    variant_id = ?skipped.variant_id,
                    reason = %skipped.reason,
                    "skipped unresolvable attribute value"
                );
            }
            resolved.values
        }
        None => Vec::new(),
    };

    Ok(Json(ApiResponse::new(
        ProductAttributesData {
            product_id: product.id,
            category_path: crumbs(&state, rid, category_id).await?,
            attributes,
        },
        req_id.0.clone(),
    )))
}

/// GET /api/v1/public/categories/{id}/attributes: the attribute schema that
/// applies to a category.
pub(super) async fn category_attributes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category_id): Path<i64>,
) -> Result<Json<ApiResponse<CategoryAttributesData>>, ApiError> {
    let rid = &req_id.0;
    let schema = souk_db::load_schema_for_category(&state.pool, category_id)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    Ok(Json(ApiResponse::new(
        CategoryAttributesData {
            category_id,
            category_path: crumbs(&state, rid, category_id).await?,
            schema,
        },
        req_id.0.clone(),
    )))
}

/// GET /api/v1/public/store-settings
pub(super) async fn store_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StoreSettingsData>>, ApiError> {
    let rid = &req_id.0;
    let settings = souk_db::get_store_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(rid, &e))?
        .ok_or_else(|| ApiError::not_found(rid, "store settings have not been configured"))?;

    Ok(Json(ApiResponse::new(
        StoreSettingsData::from(settings),
        req_id.0.clone(),
    )))
}
