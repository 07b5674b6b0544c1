//! Live integration tests for souk-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/souk-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use std::path::Path;

use rust_decimal::Decimal;
use souk_core::{
    load_catalog_seed, resolve_values, AttributeInput, AttributeSchema, AttributeValue,
    BackorderPolicy, BuyBox, CatalogSeed, ContactFallback, OfferStatus, ProductAttribute,
    ProductStatus, StockStatus,
};
use souk_db::{
    create_category, create_offer, create_product, create_variant, get_brand_by_slug,
    get_product, get_public_product_by_slug, get_store_settings, get_vendor_by_slug,
    hard_delete, increment_view_count, list_categories, list_offers_by_product_slug,
    list_offers_for_product, list_stored_values, list_trash, list_variants,
    load_attribute_schema, load_schema_for_category, replace_attribute_values, restore,
    seed_catalog, set_offer_status, soft_delete, update_offer, update_product,
    ConstraintViolation, DbError, NewCategory, NewProduct, NewVariant, NewVendorOffer,
    NewVendorOfferVariant, OfferUpdate, ProductUpdate, TrashEntity,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn repo_seed() -> CatalogSeed {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config/catalog.yaml");
    load_catalog_seed(&path).expect("repo catalog.yaml loads")
}

async fn seeded(pool: &sqlx::PgPool) {
    seed_catalog(pool, &repo_seed())
        .await
        .expect("seed_catalog failed");
}

async fn category_id(pool: &sqlx::PgPool, slug: &str) -> i64 {
    list_categories(pool)
        .await
        .expect("list_categories failed")
        .into_iter()
        .find(|c| c.slug == slug)
        .unwrap_or_else(|| panic!("category '{slug}' not seeded"))
        .id
}

async fn vendor_id(pool: &sqlx::PgPool, slug: &str) -> i64 {
    get_vendor_by_slug(pool, slug)
        .await
        .expect("get_vendor_by_slug failed")
        .unwrap_or_else(|| panic!("vendor '{slug}' not seeded"))
        .id
}

async fn insert_laptop(pool: &sqlx::PgPool, slug: &str, status: ProductStatus) -> i64 {
    let brand = get_brand_by_slug(pool, "lenovo")
        .await
        .expect("get_brand_by_slug failed")
        .expect("lenovo seeded");
    let new = NewProduct {
        brand_id: Some(brand.id),
        category_id: Some(category_id(pool, "laptops").await),
        title: format!("Laptop {slug}"),
        slug: slug.to_string(),
        description: None,
        status,
    };
    create_product(pool, &new)
        .await
        .unwrap_or_else(|e| panic!("create_product failed for '{slug}': {e}"))
        .id
}

fn offer(product_id: i64, vendor_id: i64, price: Decimal) -> NewVendorOffer {
    NewVendorOffer {
        product_id,
        vendor_id,
        price,
        discount_price: None,
        currency_code: "USD".to_string(),
        manage_stock: false,
        stock_quantity: None,
        stock_status: StockStatus::InStock,
        backorder_policy: BackorderPolicy::NotAllowed,
        low_stock_threshold: None,
        min_order_quantity: None,
        max_order_quantity: None,
        order_quantity_step: None,
        variants: Vec::new(),
    }
}

async fn approve(pool: &sqlx::PgPool, offer_id: i64, row_version: i64) {
    set_offer_status(pool, offer_id, row_version, OfferStatus::Approved, None)
        .await
        .expect("set_offer_status failed");
}

fn attribute<'a>(schema: &'a AttributeSchema, code: &str) -> &'a ProductAttribute {
    schema
        .applicable_attributes()
        .into_iter()
        .find(|a| a.code == code)
        .unwrap_or_else(|| panic!("attribute '{code}' missing from schema"))
}

// ---------------------------------------------------------------------------
// Seeding and schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_catalog_is_repeatable(pool: sqlx::PgPool) {
    let seed = repo_seed();
    let first = seed_catalog(&pool, &seed).await.expect("first seed");
    let second = seed_catalog(&pool, &seed).await.expect("second seed");

    assert_eq!(first, second);
    assert_eq!(first.brands, seed.brands.len());
    assert!(first.store_settings);

    let categories = list_categories(&pool).await.expect("list_categories failed");
    assert_eq!(categories.len(), seed.categories.len());
}

#[sqlx::test(migrations = "../../migrations")]
async fn category_schema_is_ordered_and_inherited(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let laptops = category_id(&pool, "laptops").await;

    let schema = load_schema_for_category(&pool, laptops)
        .await
        .expect("load_schema_for_category failed")
        .expect("laptops carries a set");
    let codes: Vec<&str> = schema
        .applicable_attributes()
        .iter()
        .map(|a| a.code.as_str())
        .collect();
    assert_eq!(
        codes,
        [
            "color",
            "release_date",
            "screen_size",
            "touchscreen",
            "memory",
            "processor"
        ]
    );
    let color_labels: Vec<&str> = attribute(&schema, "color")
        .options
        .iter()
        .map(|o| o.display_label.as_str())
        .collect();
    assert_eq!(color_labels, ["Silver", "Space Gray", "Black"]);

    let gaming = create_category(
        &pool,
        &NewCategory {
            parent_id: Some(laptops),
            attribute_set_id: None,
            name: "Gaming Laptops".to_string(),
            slug: "gaming-laptops".to_string(),
            sort_order: 0,
        },
    )
    .await
    .expect("create_category failed");
    let inherited = load_schema_for_category(&pool, gaming.id)
        .await
        .expect("load_schema_for_category failed")
        .expect("inherits the laptops set");
    assert_eq!(inherited.set_id, schema.set_id);

    let computers = category_id(&pool, "computers").await;
    assert!(load_schema_for_category(&pool, computers)
        .await
        .expect("load_schema_for_category failed")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_category_schema_is_not_found(pool: sqlx::PgPool) {
    let err = load_schema_for_category(&pool, 9_999).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert!(load_attribute_schema(&pool, 9_999)
        .await
        .expect("query succeeds")
        .is_none());
}

// ---------------------------------------------------------------------------
// Products and optimistic concurrency
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn product_update_checks_row_version(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let id = insert_laptop(&pool, "thinkpad-x1", ProductStatus::Draft).await;

    let update = ProductUpdate {
        title: Some("ThinkPad X1 Carbon".to_string()),
        status: Some(ProductStatus::Active),
        ..ProductUpdate::default()
    };
    let updated = update_product(&pool, id, 1, &update)
        .await
        .expect("first update succeeds");
    assert_eq!(updated.row_version, 2);
    assert_eq!(updated.title, "ThinkPad X1 Carbon");
    assert_eq!(updated.status().expect("valid status"), ProductStatus::Active);

    let stale = update_product(&pool, id, 1, &update).await.unwrap_err();
    assert!(
        matches!(
            stale,
            DbError::Conflict { id: conflict_id, expected: 1, .. } if conflict_id == id
        ),
        "{stale}"
    );

    let missing = update_product(&pool, 9_999, 1, &update).await.unwrap_err();
    assert!(matches!(missing, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_product_slug_is_a_unique_violation(pool: sqlx::PgPool) {
    seeded(&pool).await;
    insert_laptop(&pool, "yoga-7", ProductStatus::Active).await;

    let dup = NewProduct {
        brand_id: None,
        category_id: None,
        title: "Another".to_string(),
        slug: "yoga-7".to_string(),
        description: None,
        status: ProductStatus::Draft,
    };
    let err = create_product(&pool, &dup).await.unwrap_err();
    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Unique));
}

#[sqlx::test(migrations = "../../migrations")]
async fn public_lookup_hides_drafts_and_counts_views(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let draft = insert_laptop(&pool, "draft-laptop", ProductStatus::Draft).await;
    let live = insert_laptop(&pool, "live-laptop", ProductStatus::Active).await;

    assert!(get_public_product_by_slug(&pool, "draft-laptop")
        .await
        .expect("query succeeds")
        .is_none());
    get_product(&pool, draft).await.expect("admin lookup sees drafts");

    increment_view_count(&pool, live).await.expect("increment");
    increment_view_count(&pool, live).await.expect("increment");
    let row = get_public_product_by_slug(&pool, "live-laptop")
        .await
        .expect("query succeeds")
        .expect("active product is public");
    assert_eq!(row.view_count, 2);
    assert_eq!(row.row_version, 1, "counters do not bump row_version");
}

// ---------------------------------------------------------------------------
// Attribute values
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn option_value_resolves_to_its_label_after_round_trip(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "xps-13", ProductStatus::Active).await;
    let variant = create_variant(
        &pool,
        product,
        &NewVariant {
            sku: "XPS13-SLV".to_string(),
            title: Some("Silver".to_string()),
            sort_order: 0,
        },
    )
    .await
    .expect("create_variant failed");

    let schema = load_schema_for_category(&pool, category_id(&pool, "laptops").await)
        .await
        .expect("schema query")
        .expect("schema exists");
    let color = attribute(&schema, "color");
    let silver = color.options[0].clone();
    let screen = attribute(&schema, "screen_size");

    let inputs = vec![
        AttributeInput {
            attribute_id: color.id,
            variant_id: Some(variant.id),
            value: AttributeValue::Option(silver.id),
        },
        AttributeInput {
            attribute_id: screen.id,
            variant_id: None,
            value: AttributeValue::Number(Decimal::new(134, 1)),
        },
    ];
    let written = replace_attribute_values(&pool, product, &inputs)
        .await
        .expect("replace_attribute_values failed");
    assert_eq!(written, 2);

    let stored = list_stored_values(&pool, product)
        .await
        .expect("list_stored_values failed");
    let resolved = resolve_values(&schema, &stored);
    assert!(resolved.skipped.is_empty(), "{:?}", resolved.skipped);

    let color_value = resolved
        .values
        .iter()
        .find(|v| v.attribute_code == "color")
        .expect("color resolved");
    let option = color_value.option.as_ref().expect("option resolved");
    assert_eq!(option.id, silver.id);
    assert_eq!(option.value, silver.value);
    assert_eq!(option.display_label, silver.display_label);
    assert_eq!(color_value.display, "Silver");

    let screen_value = resolved
        .values
        .iter()
        .find(|v| v.attribute_code == "screen_size")
        .expect("screen size resolved");
    assert_eq!(screen_value.value, AttributeValue::Number(Decimal::new(134, 1)));

    // Replacing drops values that are no longer submitted.
    replace_attribute_values(&pool, product, &inputs[1..])
        .await
        .expect("second replace");
    assert_eq!(list_stored_values(&pool, product).await.expect("list").len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trashed_variant_keeps_its_values_across_a_replace(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "xps-15", ProductStatus::Active).await;
    let variant = create_variant(
        &pool,
        product,
        &NewVariant {
            sku: "XPS15-BLK".to_string(),
            title: Some("Black".to_string()),
            sort_order: 0,
        },
    )
    .await
    .expect("create_variant failed");

    let schema = load_schema_for_category(&pool, category_id(&pool, "laptops").await)
        .await
        .expect("schema query")
        .expect("schema exists");
    let color = attribute(&schema, "color");
    let screen = attribute(&schema, "screen_size");
    let variant_color = AttributeInput {
        attribute_id: color.id,
        variant_id: Some(variant.id),
        value: AttributeValue::Option(color.options[2].id),
    };
    let screen_size = |inches: i64| AttributeInput {
        attribute_id: screen.id,
        variant_id: None,
        value: AttributeValue::Number(Decimal::from(inches)),
    };

    replace_attribute_values(&pool, product, &[variant_color, screen_size(15)])
        .await
        .expect("first replace");
    soft_delete(&pool, TrashEntity::Variants, variant.id)
        .await
        .expect("trash variant");

    // Only live targets can be submitted while the variant is trashed.
    replace_attribute_values(&pool, product, &[screen_size(16)])
        .await
        .expect("second replace");
    let live = list_stored_values(&pool, product).await.expect("list");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].variant_id, None);

    restore(&pool, TrashEntity::Variants, variant.id)
        .await
        .expect("restore variant");
    let restored = list_stored_values(&pool, product).await.expect("list");
    assert_eq!(restored.len(), 2);
    let color_row = restored
        .iter()
        .find(|row| row.variant_id == Some(variant.id))
        .expect("variant value survived");
    assert_eq!(color_row.attribute_id, color.id);
    assert_eq!(color_row.stored.option_id, Some(color.options[2].id));
    let product_row = restored
        .iter()
        .find(|row| row.variant_id.is_none())
        .expect("product value");
    assert_eq!(product_row.stored.numeric_value, Some(Decimal::from(16)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn value_rows_must_populate_exactly_one_column(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "check-laptop", ProductStatus::Draft).await;
    let schema = load_schema_for_category(&pool, category_id(&pool, "laptops").await)
        .await
        .expect("schema query")
        .expect("schema exists");
    let processor = attribute(&schema, "processor");

    let err = sqlx::query(
        "INSERT INTO product_attribute_values (product_id, attribute_id, raw_value, bool_value) \
         VALUES ($1, $2, 'i7', TRUE)",
    )
    .bind(product)
    .bind(processor.id)
    .execute(&pool)
    .await
    .map_err(DbError::from)
    .unwrap_err();
    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Check));
}

// ---------------------------------------------------------------------------
// Vendor offers and the buy box
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn cheapest_buyable_offer_wins_the_buy_box(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "ideapad-5", ProductStatus::Active).await;

    let northwind = vendor_id(&pool, "northwind-traders").await;
    let mut out_of_stock = offer(product, northwind, Decimal::new(100, 0));
    out_of_stock.manage_stock = true;
    out_of_stock.stock_quantity = Some(0);
    out_of_stock.min_order_quantity = Some(1);
    let a = create_offer(&pool, &out_of_stock).await.expect("create offer a");

    let mut discounted = offer(product, vendor_id(&pool, "contoso").await, Decimal::new(120, 0));
    discounted.discount_price = Some(Decimal::new(90, 0));
    discounted.manage_stock = true;
    discounted.stock_quantity = Some(5);
    discounted.min_order_quantity = Some(1);
    let b = create_offer(&pool, &discounted).await.expect("create offer b");

    // Pending offers are never buyable.
    let pending = list_offers_by_product_slug(&pool, "ideapad-5")
        .await
        .expect("list offers");
    assert_eq!(pending.len(), 2);
    assert!(!BuyBox::for_product(&pending, ContactFallback::default()).can_add_to_cart());

    approve(&pool, a.id, a.row_version).await;
    approve(&pool, b.id, b.row_version).await;

    let offers = list_offers_by_product_slug(&pool, "ideapad-5")
        .await
        .expect("list offers");
    let buy_box = BuyBox::for_product(&offers, ContactFallback::default());
    let best = buy_box.best_offer().expect("an offer is buyable");
    assert_eq!(best.offer_id, b.id);
    assert_eq!(best.effective_price, Decimal::new(90, 0));
    assert_eq!(best.vendor_slug, "contoso");
    assert_eq!(best.discount_percent, Some(25));
}

#[sqlx::test(migrations = "../../migrations")]
async fn offer_edits_check_row_version(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "legion-5", ProductStatus::Active).await;
    let created = create_offer(
        &pool,
        &offer(product, vendor_id(&pool, "contoso").await, Decimal::new(1_499, 0)),
    )
    .await
    .expect("create offer");
    assert_eq!(created.status, OfferStatus::Pending.code());

    let update = OfferUpdate {
        discount_price: Some(Decimal::new(1_399, 0)),
        stock_status: Some(StockStatus::OnBackorder),
        ..OfferUpdate::default()
    };
    let updated = update_offer(&pool, created.id, created.row_version, &update)
        .await
        .expect("update succeeds");
    assert_eq!(updated.discount_price, Some(Decimal::new(1_399, 0)));
    assert_eq!(updated.stock_status, "on_backorder");
    assert_eq!(updated.row_version, created.row_version + 1);

    let stale = update_offer(&pool, created.id, created.row_version, &update)
        .await
        .unwrap_err();
    assert!(matches!(stale, DbError::Conflict { .. }), "{stale}");

    let cleared = update_offer(
        &pool,
        created.id,
        updated.row_version,
        &OfferUpdate {
            clear_discount_price: true,
            ..OfferUpdate::default()
        },
    )
    .await
    .expect("clear discount");
    assert!(cleared.discount_price.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn variant_offers_are_attached_and_selected(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "macbook-air", ProductStatus::Active).await;
    let silver = create_variant(
        &pool,
        product,
        &NewVariant {
            sku: "MBA-SLV".to_string(),
            title: Some("Silver".to_string()),
            sort_order: 0,
        },
    )
    .await
    .expect("create variant");

    let mut new = offer(product, vendor_id(&pool, "contoso").await, Decimal::new(999, 0));
    new.variants.push(NewVendorOfferVariant {
        variant_id: silver.id,
        sku: Some("C-MBA-SLV".to_string()),
        price: Decimal::new(949, 0),
        discount_price: None,
        manage_stock: true,
        stock_quantity: Some(3),
        stock_status: StockStatus::InStock,
        low_stock_threshold: Some(5),
        min_order_quantity: None,
        max_order_quantity: None,
        order_quantity_step: None,
    });
    let created = create_offer(&pool, &new).await.expect("create offer");
    approve(&pool, created.id, created.row_version).await;

    let offers = list_offers_for_product(&pool, product).await.expect("list offers");
    assert_eq!(offers[0].variants.len(), 1);

    let buy_box = BuyBox::for_variant(&offers, silver.id, ContactFallback::default());
    let best = buy_box.best_offer().expect("variant offer buyable");
    assert_eq!(best.variant_id, Some(silver.id));
    assert_eq!(best.effective_price, Decimal::new(949, 0));
    assert!(best.low_stock);
}

#[sqlx::test(migrations = "../../migrations")]
async fn offer_variant_from_another_product_is_rejected(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "spectre", ProductStatus::Active).await;
    let other = insert_laptop(&pool, "envy", ProductStatus::Active).await;
    let foreign = create_variant(
        &pool,
        other,
        &NewVariant {
            sku: "ENVY-1".to_string(),
            title: None,
            sort_order: 0,
        },
    )
    .await
    .expect("create variant");

    let mut new = offer(product, vendor_id(&pool, "contoso").await, Decimal::new(800, 0));
    new.variants.push(NewVendorOfferVariant {
        variant_id: foreign.id,
        sku: None,
        price: Decimal::new(800, 0),
        discount_price: None,
        manage_stock: false,
        stock_quantity: None,
        stock_status: StockStatus::InStock,
        low_stock_threshold: None,
        min_order_quantity: None,
        max_order_quantity: None,
        order_quantity_step: None,
    });
    let err = create_offer(&pool, &new).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert!(list_offers_for_product(&pool, product)
        .await
        .expect("list offers")
        .is_empty());
}

// ---------------------------------------------------------------------------
// Trash and store settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn trash_lifecycle_soft_delete_restore_hard_delete(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let product = insert_laptop(&pool, "trash-me", ProductStatus::Active).await;
    create_variant(
        &pool,
        product,
        &NewVariant {
            sku: "TRASH-1".to_string(),
            title: None,
            sort_order: 0,
        },
    )
    .await
    .expect("create variant");

    let err = hard_delete(&pool, TrashEntity::Products, product).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound), "live rows cannot be hard deleted");

    soft_delete(&pool, TrashEntity::Products, product)
        .await
        .expect("soft delete");
    assert!(get_public_product_by_slug(&pool, "trash-me")
        .await
        .expect("query")
        .is_none());
    let trash = list_trash(&pool, TrashEntity::Products).await.expect("list trash");
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].label.as_deref(), Some("Laptop trash-me"));

    let again = soft_delete(&pool, TrashEntity::Products, product).await.unwrap_err();
    assert!(matches!(again, DbError::NotFound));

    restore(&pool, TrashEntity::Products, product).await.expect("restore");
    assert!(get_public_product_by_slug(&pool, "trash-me")
        .await
        .expect("query")
        .is_some());

    soft_delete(&pool, TrashEntity::Products, product)
        .await
        .expect("soft delete");
    hard_delete(&pool, TrashEntity::Products, product)
        .await
        .expect("hard delete");
    assert!(list_trash(&pool, TrashEntity::Products)
        .await
        .expect("list trash")
        .is_empty());
    assert!(
        list_variants(&pool, product).await.expect("list").is_empty(),
        "variants cascade with their product"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_settings_feed_the_contact_fallback(pool: sqlx::PgPool) {
    let defaults = get_store_settings(&pool)
        .await
        .expect("query")
        .expect("migration inserts a row");
    assert_eq!(defaults.contact_to_buy_label, "Contact us to buy");

    seeded(&pool).await;
    let settings = get_store_settings(&pool)
        .await
        .expect("query")
        .expect("row exists");
    assert_eq!(settings.store_name, "Souk Marketplace");
    let fallback = settings.contact_fallback();
    assert_eq!(fallback.phone.as_deref(), Some("+1-555-0100"));
    assert_eq!(fallback.label, "Contact us to buy");
}
