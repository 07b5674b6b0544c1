use std::path::PathBuf;

use rust_decimal::Decimal;
use souk_core::{BackorderPolicy, OfferStatus, StockStatus, VendorOffer};
use souk_db::SeedSummary;

use super::*;

fn offer(price: Decimal, discount_price: Option<Decimal>) -> VendorOffer {
    VendorOffer {
        id: 7,
        product_id: 1,
        vendor_id: 2,
        vendor_name: "Contoso Electronics".to_string(),
        vendor_slug: "contoso".to_string(),
        price,
        discount_price,
        currency_code: "USD".to_string(),
        manage_stock: false,
        stock_quantity: None,
        stock_status: StockStatus::InStock,
        backorder_policy: BackorderPolicy::NotAllowed,
        low_stock_threshold: None,
        min_order_quantity: None,
        max_order_quantity: None,
        order_quantity_step: None,
        status: OfferStatus::Approved,
        is_deleted: false,
        variants: Vec::new(),
    }
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["souk-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["souk-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_without_path() {
    let cli = Cli::try_parse_from(["souk-cli", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed { path: None }
        })
    ));
}

#[test]
fn parses_db_seed_with_path() {
    let cli = Cli::try_parse_from(["souk-cli", "db", "seed", "--path", "/tmp/catalog.yaml"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed { path: Some(ref p) }
        }) if *p == PathBuf::from("/tmp/catalog.yaml")
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["souk-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_offers_best_for_product() {
    let cli = Cli::try_parse_from(["souk-cli", "offers", "best", "thinkpad-x1"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Offers {
            command: OffersCommands::Best { ref slug, variant: None }
        }) if slug == "thinkpad-x1"
    ));
}

#[test]
fn parses_offers_best_for_variant() {
    let cli = Cli::try_parse_from(["souk-cli", "offers", "best", "thinkpad-x1", "--variant", "42"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Offers {
            command: OffersCommands::Best {
                variant: Some(42),
                ..
            }
        })
    ));
}

#[test]
fn offers_best_requires_slug() {
    assert!(Cli::try_parse_from(["souk-cli", "offers", "best"]).is_err());
}

#[test]
fn parses_offers_list() {
    let cli = Cli::try_parse_from(["souk-cli", "offers", "list", "macbook-air"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Offers {
            command: OffersCommands::List { ref slug }
        }) if slug == "macbook-air"
    ));
}

#[test]
fn seed_summary_line_counts_everything() {
    let line = db::format_seed_summary(&SeedSummary {
        brands: 4,
        vendors: 3,
        attribute_sets: 2,
        categories: 1,
        store_settings: true,
    });
    assert_eq!(
        line,
        "seeded 4 brand(s), 3 vendor(s), 2 attribute set(s), 1 category, store settings updated"
    );

    let line = db::format_seed_summary(&SeedSummary {
        categories: 5,
        ..SeedSummary::default()
    });
    assert!(line.ends_with("5 categories"), "{line}");
}

#[test]
fn offer_line_shows_list_price_only_when_discounted() {
    let plain = offers::format_offer_line(&offer(Decimal::new(12000, 2), None));
    assert!(plain.contains("contoso"), "{plain}");
    assert!(plain.contains("120.00 USD"), "{plain}");
    assert!(!plain.contains("list"), "{plain}");

    let discounted = offers::format_offer_line(&offer(
        Decimal::new(12000, 2),
        Some(Decimal::new(9000, 2)),
    ));
    assert!(discounted.contains("90.00 USD (list 120.00)"), "{discounted}");
}
