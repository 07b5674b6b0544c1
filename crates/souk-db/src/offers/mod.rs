//! Database operations for `vendor_offers` and `vendor_offer_variants`.

mod read;
mod types;
mod write;

pub use read::{get_offer, list_offers_by_product_slug, list_offers_for_product};
pub use types::{
    NewVendorOffer, NewVendorOfferVariant, OfferUpdate, VendorOfferRow, VendorOfferVariantRow,
};
pub use write::{create_offer, set_offer_status, update_offer};
