//! Vendor offers and the buy-box rule.
//!
//! The storefront shows one offer per product: the cheapest offer that is
//! live, approved, and (when stock is managed) able to fill the minimum
//! order quantity.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

pub const NO_ACTIVE_OFFER_MESSAGE: &str = "No active offer for this product";
pub const DEFAULT_CONTACT_LABEL: &str = "Contact us to buy";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Moderation state of an offer, persisted as `SMALLINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl OfferStatus {
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            OfferStatus::Pending => 0,
            OfferStatus::Approved => 1,
            OfferStatus::Rejected => 2,
            OfferStatus::Suspended => 3,
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOfferStatus`] for codes outside `0..=3`.
    pub fn from_code(code: i64) -> Result<Self, CoreError> {
        match code {
            0 => Ok(OfferStatus::Pending),
            1 => Ok(OfferStatus::Approved),
            2 => Ok(OfferStatus::Rejected),
            3 => Ok(OfferStatus::Suspended),
            other => Err(CoreError::InvalidOfferStatus(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Approved => "approved",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = CoreError;

    /// Accepts the status name in any case, or its numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return OfferStatus::from_code(code);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "pending" => Ok(OfferStatus::Pending),
            "approved" => Ok(OfferStatus::Approved),
            "rejected" => Ok(OfferStatus::Rejected),
            "suspended" => Ok(OfferStatus::Suspended),
            _ => Err(CoreError::InvalidOfferStatus(s.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOfferStatus {
    Code(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for OfferStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawOfferStatus::deserialize(deserializer)? {
            RawOfferStatus::Code(code) => OfferStatus::from_code(code),
            RawOfferStatus::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    OnBackorder,
}

impl StockStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::OnBackorder => "on_backorder",
        }
    }
}

impl std::str::FromStr for StockStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            "on_backorder" => Ok(StockStatus::OnBackorder),
            other => Err(CoreError::InvalidStockStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackorderPolicy {
    NotAllowed,
    Allow,
    AllowWithNotice,
}

impl BackorderPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackorderPolicy::NotAllowed => "not_allowed",
            BackorderPolicy::Allow => "allow",
            BackorderPolicy::AllowWithNotice => "allow_with_notice",
        }
    }
}

impl std::str::FromStr for BackorderPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_allowed" => Ok(BackorderPolicy::NotAllowed),
            "allow" => Ok(BackorderPolicy::Allow),
            "allow_with_notice" => Ok(BackorderPolicy::AllowWithNotice),
            other => Err(CoreError::InvalidBackorderPolicy(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

/// A vendor's listing for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOffer {
    pub id: i64,
    pub product_id: i64,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub vendor_slug: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub currency_code: String,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    pub stock_status: StockStatus,
    pub backorder_policy: BackorderPolicy,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
    pub status: OfferStatus,
    pub is_deleted: bool,
    #[serde(default)]
    pub variants: Vec<VendorOfferVariant>,
}

/// Per-variant terms under a [`VendorOffer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOfferVariant {
    pub id: i64,
    pub vendor_offer_id: i64,
    pub variant_id: i64,
    pub sku: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    pub stock_status: StockStatus,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
    pub is_deleted: bool,
}

/// Minimum order quantity with the storefront's default applied: unset or
/// non-positive values mean 1.
#[must_use]
pub fn effective_min_order_quantity(min_order_quantity: Option<i32>) -> i32 {
    min_order_quantity.filter(|q| *q > 0).unwrap_or(1)
}

/// The commercial terms the buy-box rule looks at.
pub trait OfferTerms {
    fn is_deleted(&self) -> bool;
    fn status(&self) -> OfferStatus;
    fn manage_stock(&self) -> bool;
    fn stock_quantity(&self) -> Option<i32>;
    fn min_order_quantity(&self) -> Option<i32>;
    fn price(&self) -> Decimal;
    fn discount_price(&self) -> Option<Decimal>;

    /// Discount price when present, list price otherwise. The discount is
    /// used even when it is not below the list price.
    fn effective_price(&self) -> Decimal {
        self.discount_price().unwrap_or_else(|| self.price())
    }

    fn has_sufficient_stock(&self) -> bool {
        !self.manage_stock()
            || self.stock_quantity().unwrap_or(0)
                >= effective_min_order_quantity(self.min_order_quantity())
    }

    fn is_buyable(&self) -> bool {
        !self.is_deleted() && self.status() == OfferStatus::Approved && self.has_sufficient_stock()
    }
}

impl OfferTerms for VendorOffer {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
    fn status(&self) -> OfferStatus {
        self.status
    }
    fn manage_stock(&self) -> bool {
        self.manage_stock
    }
    fn stock_quantity(&self) -> Option<i32> {
        self.stock_quantity
    }
    fn min_order_quantity(&self) -> Option<i32> {
        self.min_order_quantity
    }
    fn price(&self) -> Decimal {
        self.price
    }
    fn discount_price(&self) -> Option<Decimal> {
        self.discount_price
    }
}

/// A variant's terms seen through its parent offer: deletion and moderation
/// come from both levels, pricing and stock from the variant.
#[derive(Debug, Clone, Copy)]
pub struct VariantOfferView<'a> {
    pub offer: &'a VendorOffer,
    pub variant: &'a VendorOfferVariant,
}

impl OfferTerms for VariantOfferView<'_> {
    fn is_deleted(&self) -> bool {
        self.offer.is_deleted || self.variant.is_deleted
    }
    fn status(&self) -> OfferStatus {
        self.offer.status
    }
    fn manage_stock(&self) -> bool {
        self.variant.manage_stock
    }
    fn stock_quantity(&self) -> Option<i32> {
        self.variant.stock_quantity
    }
    fn min_order_quantity(&self) -> Option<i32> {
        self.variant.min_order_quantity
    }
    fn price(&self) -> Decimal {
        self.variant.price
    }
    fn discount_price(&self) -> Option<Decimal> {
        self.variant.discount_price
    }
}

impl VendorOffer {
    /// Terms for one product variant, if this offer lists it.
    #[must_use]
    pub fn variant_view(&self, variant_id: i64) -> Option<VariantOfferView<'_>> {
        self.variants
            .iter()
            .find(|v| v.variant_id == variant_id)
            .map(|variant| VariantOfferView {
                offer: self,
                variant,
            })
    }
}

/// Result of running the selection rule over a set of offers.
#[derive(Debug, Clone)]
pub struct Selection<'a, T> {
    /// Buyable offers, cheapest effective price first.
    pub buyable: Vec<&'a T>,
}

impl<'a, T> Selection<'a, T> {
    #[must_use]
    pub fn best(&self) -> Option<&'a T> {
        self.buyable.first().copied()
    }

    #[must_use]
    pub fn other_offers_count(&self) -> usize {
        self.buyable.len().saturating_sub(1)
    }
}

/// Filter offers to the buyable set and order it by effective price.
///
/// The sort is stable, so offers with equal effective prices keep their
/// input order.
#[must_use]
pub fn select_best_offer<T: OfferTerms>(offers: &[T]) -> Selection<'_, T> {
    let mut buyable: Vec<&T> = offers.iter().filter(|o| o.is_buyable()).collect();
    buyable.sort_by(|a, b| a.effective_price().cmp(&b.effective_price()));
    Selection { buyable }
}

// ---------------------------------------------------------------------------
// Order quantity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuantityPolicy {
    pub min: i32,
    pub max: Option<i32>,
    pub step: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuantityViolation {
    BelowMinimum { min: i32 },
    AboveMaximum { max: i32 },
    NotOnStep { min: i32, step: i32 },
}

impl std::fmt::Display for QuantityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantityViolation::BelowMinimum { min } => write!(f, "minimum order quantity is {min}"),
            QuantityViolation::AboveMaximum { max } => write!(f, "maximum order quantity is {max}"),
            QuantityViolation::NotOnStep { min, step } => {
                write!(f, "quantity must be {min} plus a multiple of {step}")
            }
        }
    }
}

impl OrderQuantityPolicy {
    /// Build a policy from nullable columns; non-positive values are treated
    /// as unset.
    #[must_use]
    pub fn from_bounds(min: Option<i32>, max: Option<i32>, step: Option<i32>) -> Self {
        Self {
            min: effective_min_order_quantity(min),
            max: max.filter(|m| *m > 0),
            step: step.filter(|s| *s > 0).unwrap_or(1),
        }
    }

    /// Check a requested quantity. Steps count from the minimum, so with
    /// `min = 2, step = 3` the allowed quantities are 2, 5, 8, ...
    ///
    /// # Errors
    ///
    /// Returns the first [`QuantityViolation`] found.
    pub fn check(&self, quantity: i32) -> Result<(), QuantityViolation> {
        if quantity < self.min {
            return Err(QuantityViolation::BelowMinimum { min: self.min });
        }
        if let Some(max) = self.max {
            if quantity > max {
                return Err(QuantityViolation::AboveMaximum { max });
            }
        }
        if (quantity - self.min) % self.step != 0 {
            return Err(QuantityViolation::NotOnStep {
                min: self.min,
                step: self.step,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Buy box
// ---------------------------------------------------------------------------

/// What the storefront shows when nothing is buyable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFallback {
    pub label: String,
    pub phone: Option<String>,
}

impl Default for ContactFallback {
    fn default() -> Self {
        Self {
            label: DEFAULT_CONTACT_LABEL.to_string(),
            phone: None,
        }
    }
}

/// The offer rendered in the buy box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestOffer {
    pub offer_id: i64,
    pub variant_id: Option<i64>,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub vendor_slug: String,
    pub currency_code: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub effective_price: Decimal,
    /// Whole percent off the list price; only set when the discount is
    /// actually below the list price.
    pub discount_percent: Option<u8>,
    /// The stored discount is not below the list price. The effective price
    /// still uses it.
    pub discount_exceeds_price: bool,
    pub low_stock: bool,
    pub quantity: OrderQuantityPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BuyBox {
    Available {
        offer: BestOffer,
        /// Carried alongside the state by the buy-box response, which
        /// reports it for both states.
        #[serde(skip)]
        other_offers_count: usize,
    },
    Unavailable {
        message: String,
        contact: ContactFallback,
    },
}

impl BuyBox {
    /// Run the selection rule over product-level offers.
    #[must_use]
    pub fn for_product(offers: &[VendorOffer], fallback: ContactFallback) -> Self {
        let selection = select_best_offer(offers);
        match selection.best() {
            Some(best) => BuyBox::Available {
                offer: BestOffer::from_offer(best),
                other_offers_count: selection.other_offers_count(),
            },
            None => BuyBox::unavailable(fallback),
        }
    }

    /// Run the selection rule over the offers that list `variant_id`.
    #[must_use]
    pub fn for_variant(offers: &[VendorOffer], variant_id: i64, fallback: ContactFallback) -> Self {
        let views: Vec<VariantOfferView<'_>> =
            offers.iter().filter_map(|o| o.variant_view(variant_id)).collect();
        let selection = select_best_offer(&views);
        match selection.best() {
            Some(best) => BuyBox::Available {
                offer: BestOffer::from_variant_view(best),
                other_offers_count: selection.other_offers_count(),
            },
            None => BuyBox::unavailable(fallback),
        }
    }

    fn unavailable(contact: ContactFallback) -> Self {
        BuyBox::Unavailable {
            message: NO_ACTIVE_OFFER_MESSAGE.to_string(),
            contact,
        }
    }

    #[must_use]
    pub fn can_add_to_cart(&self) -> bool {
        matches!(self, BuyBox::Available { .. })
    }

    /// Buyable offers beyond the best one; zero when unavailable.
    #[must_use]
    pub fn other_offers_count(&self) -> usize {
        match self {
            BuyBox::Available {
                other_offers_count, ..
            } => *other_offers_count,
            BuyBox::Unavailable { .. } => 0,
        }
    }

    #[must_use]
    pub fn best_offer(&self) -> Option<&BestOffer> {
        match self {
            BuyBox::Available { offer, .. } => Some(offer),
            BuyBox::Unavailable { .. } => None,
        }
    }
}

impl BestOffer {
    fn from_offer(offer: &VendorOffer) -> Self {
        Self {
            offer_id: offer.id,
            variant_id: None,
            vendor_id: offer.vendor_id,
            vendor_name: offer.vendor_name.clone(),
            vendor_slug: offer.vendor_slug.clone(),
            currency_code: offer.currency_code.clone(),
            price: offer.price,
            discount_price: offer.discount_price,
            effective_price: offer.effective_price(),
            discount_percent: discount_percent(offer.price, offer.discount_price),
            discount_exceeds_price: discount_exceeds_price(offer.price, offer.discount_price),
            low_stock: is_low_stock(
                offer.manage_stock,
                offer.stock_quantity,
                offer.low_stock_threshold,
            ),
            quantity: OrderQuantityPolicy::from_bounds(
                offer.min_order_quantity,
                offer.max_order_quantity,
                offer.order_quantity_step,
            ),
        }
    }

    fn from_variant_view(view: &VariantOfferView<'_>) -> Self {
        let variant = view.variant;
        Self {
            offer_id: view.offer.id,
            variant_id: Some(variant.variant_id),
            vendor_id: view.offer.vendor_id,
            vendor_name: view.offer.vendor_name.clone(),
            vendor_slug: view.offer.vendor_slug.clone(),
            currency_code: view.offer.currency_code.clone(),
            price: variant.price,
            discount_price: variant.discount_price,
            effective_price: view.effective_price(),
            discount_percent: discount_percent(variant.price, variant.discount_price),
            discount_exceeds_price: discount_exceeds_price(variant.price, variant.discount_price),
            low_stock: is_low_stock(
                variant.manage_stock,
                variant.stock_quantity,
                variant.low_stock_threshold,
            ),
            quantity: OrderQuantityPolicy::from_bounds(
                variant.min_order_quantity,
                variant.max_order_quantity,
                variant.order_quantity_step,
            ),
        }
    }
}

/// Percent off, rounded half away from zero. `None` unless
/// `0 <= discount < price`.
#[must_use]
pub fn discount_percent(price: Decimal, discount_price: Option<Decimal>) -> Option<u8> {
    let discount = discount_price?;
    if price <= Decimal::ZERO || discount >= price || discount < Decimal::ZERO {
        return None;
    }
    ((price - discount) / price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
}

#[must_use]
pub fn discount_exceeds_price(price: Decimal, discount_price: Option<Decimal>) -> bool {
    discount_price.is_some_and(|d| d >= price)
}

fn is_low_stock(manage_stock: bool, stock_quantity: Option<i32>, threshold: Option<i32>) -> bool {
    manage_stock && threshold.is_some_and(|t| stock_quantity.unwrap_or(0) <= t)
}

#[cfg(test)]
#[path = "offers_test.rs"]
mod tests;
