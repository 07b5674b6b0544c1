//! `offers` sub-commands: read-only views over a product's vendor offers.

use clap::Subcommand;
use souk_core::{select_best_offer, BuyBox, ContactFallback, OfferTerms, VendorOffer};

/// Sub-commands available under `offers`.
#[derive(Debug, Subcommand)]
pub enum OffersCommands {
    /// Print the buy box for a public product as JSON
    Best {
        /// Product slug
        slug: String,
        /// Compute the buy box for one product variant
        #[arg(long)]
        variant: Option<i64>,
    },
    /// List buyable offers for a public product, cheapest first
    List {
        /// Product slug
        slug: String,
    },
}

pub(crate) async fn run_offers_command(
    pool: &sqlx::PgPool,
    command: OffersCommands,
) -> anyhow::Result<()> {
    match command {
        OffersCommands::Best { slug, variant } => {
            let offers = load_public_offers(pool, &slug).await?;
            let fallback = souk_db::get_store_settings(pool)
                .await?
                .map_or_else(ContactFallback::default, |s| s.contact_fallback());
            let buy_box = match variant {
                Some(variant_id) => BuyBox::for_variant(&offers, variant_id, fallback),
                None => BuyBox::for_product(&offers, fallback),
            };
            let mut out = serde_json::to_value(&buy_box)?;
            out["can_add_to_cart"] = buy_box.can_add_to_cart().into();
            out["other_offers_count"] = buy_box.other_offers_count().into();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OffersCommands::List { slug } => {
            let offers = load_public_offers(pool, &slug).await?;
            let selection = select_best_offer(&offers);
            if selection.buyable.is_empty() {
                println!("no buyable offers for '{slug}'");
            }
            for offer in selection.buyable {
                println!("{}", format_offer_line(offer));
            }
        }
    }
    Ok(())
}

async fn load_public_offers(pool: &sqlx::PgPool, slug: &str) -> anyhow::Result<Vec<VendorOffer>> {
    if souk_db::get_public_product_by_slug(pool, slug).await?.is_none() {
        anyhow::bail!("product '{slug}' not found or not active");
    }
    Ok(souk_db::list_offers_by_product_slug(pool, slug).await?)
}

/// `<offer id>  <vendor slug>  <effective price> <currency>`, with the list
/// price when a discount applies.
pub(crate) fn format_offer_line(offer: &VendorOffer) -> String {
    let effective = offer.effective_price();
    let list = if effective == offer.price {
        String::new()
    } else {
        format!(" (list {})", offer.price.round_dp(2))
    };
    format!(
        "{:>6}  {:<24}  {} {}{list}",
        offer.id,
        offer.vendor_slug,
        effective.round_dp(2),
        offer.currency_code,
    )
}
