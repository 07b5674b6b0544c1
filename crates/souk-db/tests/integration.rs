//! Offline tests for souk-db pool configuration, row conversions, and the
//! trash entity vocabulary. These tests do not require a live database.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::Utc;
use rust_decimal::Decimal;
use souk_core::{AppConfig, BackorderPolicy, Environment, OfferStatus, StockStatus};
use souk_db::{PoolConfig, TrashEntity, VendorOfferRow, VendorOfferVariantRow};
use uuid::Uuid;

fn offer_row(status: i16, stock_status: &str) -> VendorOfferRow {
    VendorOfferRow {
        id: 10,
        public_id: Uuid::new_v4(),
        product_id: 1,
        vendor_id: 2,
        vendor_name: "Northwind Traders".to_string(),
        vendor_slug: "northwind-traders".to_string(),
        price: Decimal::new(12_000, 2),
        discount_price: Some(Decimal::new(9_000, 2)),
        currency_code: "USD".to_string(),
        manage_stock: true,
        stock_quantity: Some(5),
        stock_status: stock_status.to_string(),
        backorder_policy: "allow_with_notice".to_string(),
        low_stock_threshold: Some(2),
        min_order_quantity: None,
        max_order_quantity: Some(10),
        order_quantity_step: None,
        status,
        moderation_note: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        is_deleted: false,
        deleted_at: None,
        row_version: 1,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        catalog_seed_path: PathBuf::from("./config/catalog.yaml"),
        api_key_hash_salt: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        rate_limit_per_minute: 120,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout, std::time::Duration::from_secs(9));
}

#[test]
fn offer_row_converts_into_domain_offer() {
    let offer = offer_row(1, "in_stock")
        .into_offer(Vec::new())
        .expect("valid row converts");

    assert_eq!(offer.status, OfferStatus::Approved);
    assert_eq!(offer.stock_status, StockStatus::InStock);
    assert_eq!(offer.backorder_policy, BackorderPolicy::AllowWithNotice);
    assert_eq!(offer.vendor_slug, "northwind-traders");
    assert!(offer.variants.is_empty());
}

#[test]
fn offer_row_with_unknown_status_code_is_invalid() {
    let err = offer_row(7, "in_stock").into_offer(Vec::new()).unwrap_err();
    assert!(matches!(err, souk_db::DbError::InvalidRow(_)), "{err}");
}

#[test]
fn offer_row_with_unknown_stock_status_is_invalid() {
    let err = offer_row(1, "sold_out").into_offer(Vec::new()).unwrap_err();
    assert!(matches!(err, souk_db::DbError::InvalidRow(_)), "{err}");
}

#[test]
fn offer_variant_row_converts() {
    let row = VendorOfferVariantRow {
        id: 3,
        public_id: Uuid::new_v4(),
        vendor_offer_id: 10,
        variant_id: 77,
        sku: Some("LAP-16-SLV".to_string()),
        price: Decimal::new(99_900, 2),
        discount_price: None,
        manage_stock: false,
        stock_quantity: None,
        stock_status: "on_backorder".to_string(),
        low_stock_threshold: None,
        min_order_quantity: Some(2),
        max_order_quantity: None,
        order_quantity_step: Some(2),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        is_deleted: false,
        deleted_at: None,
        row_version: 1,
    };

    let variant = souk_core::VendorOfferVariant::try_from(row).expect("valid row converts");
    assert_eq!(variant.variant_id, 77);
    assert_eq!(variant.stock_status, StockStatus::OnBackorder);
    assert_eq!(variant.order_quantity_step, Some(2));
}

#[test]
fn trash_entities_round_trip_through_path_segments() {
    for entity in TrashEntity::ALL {
        let parsed: TrashEntity = entity.to_string().parse().expect("known entity");
        assert_eq!(parsed, entity);
    }
    assert!("attribute_sets".parse::<TrashEntity>().is_err());
}
