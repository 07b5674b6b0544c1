use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use souk_core::{BackorderPolicy, OfferStatus, StockStatus, VendorOffer, VendorOfferVariant};

use crate::DbError;

/// A `vendor_offers` row joined with its vendor's name and slug.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorOfferRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: i64,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub vendor_slug: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub currency_code: String,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    pub stock_status: String,
    pub backorder_policy: String,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
    /// 0 pending, 1 approved, 2 rejected, 3 suspended.
    pub status: i16,
    pub moderation_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

/// A row from the `vendor_offer_variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorOfferVariantRow {
    pub id: i64,
    pub public_id: Uuid,
    pub vendor_offer_id: i64,
    pub variant_id: i64,
    pub sku: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    pub stock_status: String,
    pub low_stock_threshold: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub order_quantity_step: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

impl VendorOfferRow {
    /// Converts into the domain offer used by the buy-box rule.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if a stored enum value is unknown.
    pub fn into_offer(self, variants: Vec<VendorOfferVariant>) -> Result<VendorOffer, DbError> {
        Ok(VendorOffer {
            id: self.id,
            product_id: self.product_id,
            vendor_id: self.vendor_id,
            vendor_name: self.vendor_name,
            vendor_slug: self.vendor_slug,
            price: self.price,
            discount_price: self.discount_price,
            currency_code: self.currency_code,
            manage_stock: self.manage_stock,
            stock_quantity: self.stock_quantity,
            stock_status: self.stock_status.parse()?,
            backorder_policy: self.backorder_policy.parse()?,
            low_stock_threshold: self.low_stock_threshold,
            min_order_quantity: self.min_order_quantity,
            max_order_quantity: self.max_order_quantity,
            order_quantity_step: self.order_quantity_step,
            status: OfferStatus::from_code(i64::from(self.status))?,
            is_deleted: self.is_deleted,
            variants,
        })
    }
}

impl TryFrom<VendorOfferVariantRow> for VendorOfferVariant {
    type Error = DbError;

    fn try_from(row: VendorOfferVariantRow) -> Result<Self, Self::Error> {
        Ok(VendorOfferVariant {
            id: row.id,
            vendor_offer_id: row.vendor_offer_id,
            variant_id: row.variant_id,
            sku: row.sku,
            price: row.price,
            discount_price: row.discount_price,
            manage_stock: row.manage_stock,
            stock_quantity: row.stock_quantity,
            stock_status: row.stock_status.parse()?,
            low_stock_threshold: row.low_stock_threshold,
            min_order_quantity: row.min_order_quantity,
            max_order_quantity: row.max_order_quantity,
            order_quantity_step: row.order_quantity_step,
            is_deleted: row.is_deleted,
        })
    }
}

/// A new offer. Offers start in [`OfferStatus::Pending`] until moderated.
#[derive(Debug, Clone)]
pub struct NewVendorOffer {
    pub product_id: i64,
    pub vendor_id: i64,
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
    pub variants: Vec<NewVendorOfferVariant>,
}

#[derive(Debug, Clone)]
pub struct NewVendorOfferVariant {
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
}

/// Partial update of an offer's commercial terms; `None` leaves a column
/// unchanged. `clear_discount_price` removes the discount and wins over
/// `discount_price`.
#[derive(Debug, Clone, Default)]
pub struct OfferUpdate {
    pub price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub clear_discount_price: bool,
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

pub(super) const OFFER_SELECT: &str = "\
    o.id, o.public_id, o.product_id, o.vendor_id, v.name AS vendor_name, \
    v.slug AS vendor_slug, o.price, o.discount_price, o.currency_code, o.manage_stock, \
    o.stock_quantity, o.stock_status, o.backorder_policy, o.low_stock_threshold, \
    o.min_order_quantity, o.max_order_quantity, o.order_quantity_step, o.status, \
    o.moderation_note, o.created_at, o.updated_at, o.is_deleted, o.deleted_at, o.row_version";

pub(super) const OFFER_VARIANT_COLUMNS: &str = "\
    ov.id, ov.public_id, ov.vendor_offer_id, ov.variant_id, ov.sku, ov.price, \
    ov.discount_price, ov.manage_stock, ov.stock_quantity, ov.stock_status, \
    ov.low_stock_threshold, ov.min_order_quantity, ov.max_order_quantity, \
    ov.order_quantity_step, ov.created_at, ov.updated_at, ov.is_deleted, ov.deleted_at, \
    ov.row_version";
