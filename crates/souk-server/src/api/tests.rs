use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use souk_core::{OfferStatus, ProductStatus, NO_ACTIVE_OFFER_MESSAGE};
use souk_db::{NewProduct, NewVendorOffer};

use super::*;

const TOKEN: &str = "test-admin-key";

// ---------------------------------------------------------------------------
// Envelope and error mapping
// ---------------------------------------------------------------------------

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("validation_error", StatusCode::BAD_REQUEST),
        ("conflict", StatusCode::CONFLICT),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ("something_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn db_errors_map_to_api_codes() {
    assert_eq!(
        map_db_error("req-1", &DbError::NotFound).error.code,
        "not_found"
    );
    let conflict = DbError::Conflict {
        entity: "product",
        id: 7,
        expected: 3,
    };
    assert_eq!(map_db_error("req-1", &conflict).error.code, "conflict");
    assert_eq!(
        map_db_error("req-1", &DbError::InvalidRow("bad".to_string()))
            .error
            .code,
        "internal_error"
    );
}

#[test]
fn error_details_are_omitted_unless_set() {
    let plain = serde_json::to_value(ApiError::validation("req-1", "nope")).expect("serialize");
    assert!(plain["error"].get("details").is_none());
    assert_eq!(plain["meta"]["request_id"], "req-1");

    let detailed = serde_json::to_value(
        ApiError::validation("req-1", "nope").with_details(json!({ "issues": [1, 2] })),
    )
    .expect("serialize");
    assert_eq!(detailed["error"]["details"]["issues"], json!([1, 2]));
}

#[test]
fn response_envelope_wraps_data_and_meta() {
    let value =
        serde_json::to_value(ApiResponse::new(json!({ "ok": true }), "req-9".to_string()))
            .expect("serialize");
    assert_eq!(value["data"]["ok"], true);
    assert_eq!(value["meta"]["request_id"], "req-9");
    assert!(value["meta"]["timestamp"].is_string());
}

// ---------------------------------------------------------------------------
// Router helpers
// ---------------------------------------------------------------------------

fn test_app(pool: sqlx::PgPool) -> Router {
    test_app_with_limit(pool, RateLimitState::per_minute(1_000))
}

fn test_app_with_limit(pool: sqlx::PgPool, rate_limit: RateLimitState) -> Router {
    let auth = AuthState::from_keys(TOKEN, None, false).expect("auth");
    build_app(AppState { pool }, auth, rate_limit)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal string")).expect("decimal")
}

async fn seeded(pool: &sqlx::PgPool) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("catalog.yaml");
    let seed = souk_core::load_catalog_seed(&path).expect("repo seed");
    souk_db::seed_catalog(pool, &seed).await.expect("seed");
}

async fn laptops_category(pool: &sqlx::PgPool) -> i64 {
    souk_db::list_categories(pool)
        .await
        .expect("categories")
        .into_iter()
        .find(|c| c.slug == "laptops")
        .expect("laptops category")
        .id
}

async fn insert_product(pool: &sqlx::PgPool, slug: &str, status: ProductStatus) -> i64 {
    let category_id = laptops_category(pool).await;
    souk_db::create_product(
        pool,
        &NewProduct {
            brand_id: None,
            category_id: Some(category_id),
            title: format!("Laptop {slug}"),
            slug: slug.to_string(),
            description: None,
            status,
        },
    )
    .await
    .expect("insert product")
    .id
}

async fn insert_offer(
    pool: &sqlx::PgPool,
    product_id: i64,
    vendor_slug: &str,
    price: Decimal,
    discount_price: Option<Decimal>,
    stock: i32,
    status: OfferStatus,
) -> i64 {
    let vendor = souk_db::get_vendor_by_slug(pool, vendor_slug)
        .await
        .expect("vendor lookup")
        .expect("vendor exists");
    let row = souk_db::create_offer(
        pool,
        &NewVendorOffer {
            product_id,
            vendor_id: vendor.id,
            price,
            discount_price,
            currency_code: "USD".to_string(),
            manage_stock: true,
            stock_quantity: Some(stock),
            stock_status: souk_core::StockStatus::InStock,
            backorder_policy: souk_core::BackorderPolicy::NotAllowed,
            low_stock_threshold: None,
            min_order_quantity: Some(1),
            max_order_quantity: None,
            order_quantity_step: None,
            variants: Vec::new(),
        },
    )
    .await
    .expect("insert offer");
    if status != OfferStatus::Pending {
        souk_db::set_offer_status(pool, row.id, row.row_version, status, None)
            .await
            .expect("moderate offer");
    }
    row.id
}

// ---------------------------------------------------------------------------
// Storefront
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_database_ok(pool: sqlx::PgPool) {
    let app = test_app(pool);
    let (status, json) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["database"], "ok");
}

#[sqlx::test(migrations = "../../migrations")]
async fn buy_box_picks_cheapest_buyable_offer(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "thinkpad-x1", ProductStatus::Active).await;
    // Out of stock, so never selected despite the lower list price.
    insert_offer(
        &pool,
        product,
        "northwind-traders",
        Decimal::from(100),
        None,
        0,
        OfferStatus::Approved,
    )
    .await;
    let best = insert_offer(
        &pool,
        product,
        "contoso",
        Decimal::from(120),
        Some(Decimal::from(90)),
        5,
        OfferStatus::Approved,
    )
    .await;
    // Cheapest of all but still pending moderation.
    insert_offer(
        &pool,
        product,
        "fabrikam",
        Decimal::from(50),
        None,
        5,
        OfferStatus::Pending,
    )
    .await;

    let app = test_app(pool);
    let (status, json) = send(&app, get("/api/v1/public/products/thinkpad-x1/buy-box")).await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["state"], "available");
    assert_eq!(data["can_add_to_cart"], true);
    assert_eq!(data["other_offers_count"], 0);
    assert_eq!(data["offer"]["offer_id"], best);
    assert_eq!(data["offer"]["vendor_slug"], "contoso");
    assert_eq!(decimal(&data["offer"]["effective_price"]), Decimal::from(90));
    assert_eq!(data["offer"]["discount_percent"], 25);
    assert_eq!(data["offer"]["discount_exceeds_price"], false);
}

#[sqlx::test(migrations = "../../migrations")]
async fn buy_box_without_buyable_offers_shows_store_contact(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "macbook-air", ProductStatus::Active).await;
    insert_offer(
        &pool,
        product,
        "contoso",
        Decimal::from(200),
        None,
        5,
        OfferStatus::Pending,
    )
    .await;

    let app = test_app(pool);
    let (status, json) = send(&app, get("/api/v1/public/products/macbook-air/buy-box")).await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["state"], "unavailable");
    assert_eq!(data["can_add_to_cart"], false);
    assert_eq!(data["message"], NO_ACTIVE_OFFER_MESSAGE);
    assert_eq!(data["contact"]["label"], "Contact us to buy");
    assert_eq!(data["contact"]["phone"], "+1-555-0100");
}

#[sqlx::test(migrations = "../../migrations")]
async fn draft_products_are_not_public(pool: sqlx::PgPool) {
    seeded(&pool).await;
    insert_product(&pool, "prototype", ProductStatus::Draft).await;

    let app = test_app(pool);
    for uri in [
        "/api/v1/public/products/prototype/buy-box",
        "/api/v1/public/products/prototype/offers",
        "/api/v1/public/products/missing/attributes",
    ] {
        let (status, json) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json["error"]["code"], "not_found");
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn public_offers_are_buyable_and_cheapest_first(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "galaxy-book", ProductStatus::Active).await;
    insert_offer(
        &pool,
        product,
        "contoso",
        Decimal::from(300),
        None,
        5,
        OfferStatus::Approved,
    )
    .await;
    insert_offer(
        &pool,
        product,
        "fabrikam",
        Decimal::from(280),
        None,
        5,
        OfferStatus::Approved,
    )
    .await;
    insert_offer(
        &pool,
        product,
        "northwind-traders",
        Decimal::from(250),
        None,
        5,
        OfferStatus::Suspended,
    )
    .await;

    let app = test_app(pool);
    let (status, json) = send(&app, get("/api/v1/public/products/galaxy-book/offers")).await;

    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = json["data"]["offers"]
        .as_array()
        .expect("offers array")
        .iter()
        .map(|o| o["vendor_slug"].as_str().expect("slug"))
        .collect();
    assert_eq!(slugs, ["fabrikam", "contoso"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn category_attributes_include_breadcrumb_and_schema(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let laptops = laptops_category(&pool).await;

    let app = test_app(pool);
    let (status, json) = send(
        &app,
        get(&format!("/api/v1/public/categories/{laptops}/attributes")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let crumbs: Vec<&str> = json["data"]["category_path"]
        .as_array()
        .expect("path")
        .iter()
        .map(|c| c["slug"].as_str().expect("slug"))
        .collect();
    assert_eq!(crumbs, ["electronics", "computers", "laptops"]);
    assert_eq!(json["data"]["schema"]["set_name"], "Laptops");

    let (status, _) = send(&app, get("/api/v1/public/categories/999999/attributes")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_settings_are_public(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let app = test_app(pool);
    let (status, json) = send(&app, get("/api/v1/public/store-settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["store_name"], "Souk Marketplace");
    assert_eq!(json["data"]["currency_code"], "USD");
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn admin_routes_require_bearer_token(pool: sqlx::PgPool) {
    let app = test_app(pool);

    let (status, json) = send(&app, get("/api/v1/admin/trash/products")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let wrong = Request::builder()
        .uri("/api/v1/admin/trash/products")
        .header("authorization", "Bearer not-the-key")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, admin_request("GET", "/api/v1/admin/trash/products", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn admin_rate_limit_rejects_excess_requests(pool: sqlx::PgPool) {
    let app = test_app_with_limit(pool, RateLimitState::new(1, Duration::from_secs(60)));

    let (status, _) = send(&app, admin_request("GET", "/api/v1/admin/trash/products", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = send(
        &app,
        admin_request("GET", "/api/v1/admin/trash/products", None),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");

    // Public routes sit outside the limiter.
    let (status, _) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_and_update_product_with_row_version(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let laptops = laptops_category(&pool).await;
    let app = test_app(pool);

    let (status, json) = send(
        &app,
        admin_request(
            "POST",
            "/api/v1/admin/products",
            Some(json!({ "title": "ThinkPad T14 Gen 5", "category_id": laptops })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["slug"], "thinkpad-t14-gen-5");
    assert_eq!(json["data"]["status"], "draft");
    let id = json["data"]["id"].as_i64().expect("id");
    let version = json["data"]["row_version"].as_i64().expect("row_version");

    let (status, json) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/api/v1/admin/products/{id}"),
            Some(json!({ "row_version": version, "status": "active" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "active");

    // Same stale version again.
    let (status, json) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/api/v1/admin/products/{id}"),
            Some(json!({ "row_version": version, "title": "Renamed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_product_rejects_bad_input(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let app = test_app(pool);

    for body in [
        json!({ "title": "   " }),
        json!({ "title": "Ok", "slug": "Not A Slug" }),
        json!({ "title": "Ok", "category_id": 999_999 }),
    ] {
        let (status, json) =
            send(&app, admin_request("POST", "/api/v1/admin/products", Some(body.clone()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"]["code"], "validation_error");
    }

    let first = json!({ "title": "Duplicate" });
    let (status, _) = send(
        &app,
        admin_request("POST", "/api/v1/admin/products", Some(first.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        admin_request("POST", "/api/v1/admin/products", Some(first)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../migrations")]
async fn attribute_values_are_validated_then_resolved(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "yoga-slim", ProductStatus::Active).await;
    let schema = souk_db::load_schema_for_category(&pool, laptops_category(&pool).await)
        .await
        .expect("schema")
        .expect("laptops schema");
    let attribute_id = |code: &str| {
        schema
            .groups
            .iter()
            .flat_map(|g| g.attributes.iter())
            .find(|a| a.code == code)
            .map(|a| a.id)
            .expect("attribute in schema")
    };
    let screen_size = attribute_id("screen_size");
    let processor = attribute_id("processor");

    let app = test_app(pool);
    let uri = format!("/api/v1/admin/products/{product}/attribute-values");

    let (status, json) = send(
        &app,
        admin_request(
            "PUT",
            &uri,
            Some(json!({ "values": [
                { "attribute_id": screen_size, "value": { "type": "text", "value": "big" } }
            ]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["details"]["issues"][0]["kind"], "type_mismatch");

    let (status, json) = send(
        &app,
        admin_request(
            "PUT",
            &uri,
            Some(json!({ "values": [
                { "attribute_id": screen_size, "value": { "type": "number", "value": "14" } },
                { "attribute_id": processor, "value": { "type": "text", "value": "Core Ultra 7" } }
            ]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["written"], 2);

    let (status, json) = send(&app, get("/api/v1/public/products/yoga-slim/attributes")).await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = json["data"]["attributes"]
        .as_array()
        .expect("attributes")
        .iter()
        .map(|a| a["attribute_code"].as_str().expect("code"))
        .collect();
    assert_eq!(codes, ["screen_size", "processor"]);
    assert_eq!(json["data"]["category_path"][2]["slug"], "laptops");
}

#[sqlx::test(migrations = "../../migrations")]
async fn offer_create_moderate_and_clear_discount(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "pixelbook", ProductStatus::Active).await;
    let vendor = souk_db::get_vendor_by_slug(&pool, "contoso")
        .await
        .expect("vendor lookup")
        .expect("vendor");
    let app = test_app(pool);

    let (status, json) = send(
        &app,
        admin_request(
            "POST",
            "/api/v1/admin/offers",
            Some(json!({
                "product_id": product,
                "vendor_id": vendor.id,
                "price": "999.00",
                "discount_price": "899.00"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["data"]["status_name"], "pending");
    assert_eq!(json["data"]["currency_code"], "USD");
    let id = json["data"]["id"].as_i64().expect("id");
    let version = json["data"]["row_version"].as_i64().expect("row_version");

    let (status, _) = send(&app, get("/api/v1/public/products/pixelbook/buy-box")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        admin_request(
            "PUT",
            &format!("/api/v1/admin/offers/{id}/status"),
            Some(json!({ "row_version": version, "status": "approved" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], 1);
    let version = json["data"]["row_version"].as_i64().expect("row_version");

    let (status, json) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/api/v1/admin/offers/{id}"),
            Some(json!({ "row_version": version, "discount_price": null })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["discount_price"].is_null());

    let (_, json) = send(&app, get("/api/v1/public/products/pixelbook/buy-box")).await;
    assert_eq!(json["data"]["state"], "available");
    assert_eq!(decimal(&json["data"]["offer"]["effective_price"]), Decimal::from(999));
}

#[sqlx::test(migrations = "../../migrations")]
async fn offer_create_rejects_invalid_terms(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "chromebook", ProductStatus::Active).await;
    let app = test_app(pool);

    for body in [
        json!({ "product_id": product, "vendor_id": 1, "price": "-1" }),
        json!({ "product_id": product, "vendor_id": 1, "price": "10", "currency_code": "DOLLARS" }),
        json!({ "product_id": product, "vendor_id": 1, "price": "10",
                "min_order_quantity": 5, "max_order_quantity": 2 }),
        json!({ "product_id": product, "vendor_id": 1, "price": "10", "order_quantity_step": 0 }),
    ] {
        let (status, _) = send(
            &app,
            admin_request("POST", "/api/v1/admin/offers", Some(body.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn attribute_set_and_category_creation(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        admin_request(
            "POST",
            "/api/v1/admin/attribute-sets",
            Some(json!({
                "name": "Phones",
                "groups": [{ "name": "Radio", "attributes": [
                    { "code": "band", "name": "Band", "value_type": "option" }
                ]}]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        admin_request(
            "POST",
            "/api/v1/admin/attribute-sets",
            Some(json!({
                "name": "Phones",
                "groups": [{ "name": "Radio", "attributes": [
                    { "code": "band", "name": "Band", "value_type": "option",
                      "options": [{ "value": "5g", "label": "5G" }] },
                    { "code": "dual_sim", "name": "Dual SIM", "value_type": "bool" }
                ]}]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    let set_id = json["data"]["id"].as_i64().expect("id");
    assert_eq!(json["data"]["schema"]["groups"][0]["attributes"][1]["code"], "dual_sim");

    let (status, json) = send(
        &app,
        admin_request(
            "POST",
            "/api/v1/admin/categories",
            Some(json!({ "name": "Phones", "attribute_set_id": set_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["slug"], "phones");

    let (status, _) = send(
        &app,
        admin_request(
            "POST",
            "/api/v1/admin/categories",
            Some(json!({ "name": "Orphans", "parent_id": 999_999 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trash_lifecycle_over_http(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_product(&pool, "surface-laptop", ProductStatus::Active).await;
    let app = test_app(pool);

    let (status, json) = send(
        &app,
        admin_request("DELETE", &format!("/api/v1/admin/products/{product}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["action"], "trashed");

    let (status, _) = send(&app, get("/api/v1/public/products/surface-laptop/buy-box")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, admin_request("GET", "/api/v1/admin/trash/products", None)).await;
    assert_eq!(json["data"][0]["id"], product);
    assert_eq!(json["data"][0]["label"], "Laptop surface-laptop");

    let (status, _) = send(
        &app,
        admin_request("POST", &format!("/api/v1/admin/trash/products/{product}/restore"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/api/v1/public/products/surface-laptop/buy-box")).await;
    assert_eq!(status, StatusCode::OK);

    // Live rows cannot be hard-deleted.
    let (status, _) = send(
        &app,
        admin_request("DELETE", &format!("/api/v1/admin/trash/products/{product}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        admin_request("DELETE", &format!("/api/v1/admin/products/{product}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = send(
        &app,
        admin_request("DELETE", &format!("/api/v1/admin/trash/products/{product}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["action"], "deleted");
}

#[sqlx::test(migrations = "../../migrations")]
async fn generic_soft_delete_and_unknown_entity(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let brand = souk_db::get_brand_by_slug(&pool, "patagonia")
        .await
        .expect("brand lookup")
        .expect("brand");
    let app = test_app(pool);

    let (status, json) = send(
        &app,
        admin_request("DELETE", &format!("/api/v1/admin/brands/{}", brand.id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["entity"], "brands");

    let (status, json) = send(
        &app,
        admin_request("GET", "/api/v1/admin/trash/widgets", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "unknown entity 'widgets'");
}
