pub mod app_config;
pub mod attributes;
pub mod catalog;
pub mod config;
pub mod offers;
pub mod seed;

pub use app_config::{AppConfig, Environment};
pub use attributes::{
    resolve_values, validate_values, AttributeGroup, AttributeInput, AttributeOption,
    AttributeSchema, AttributeValue, AttributeValueType, ProductAttribute,
    ResolvedAttributeValue, ResolvedOption, ResolvedValues, SkippedValue, StoredAttributeRow,
    StoredAttributeValue, ValidationIssue,
};
pub use catalog::{
    category_path, effective_attribute_set, is_valid_slug, slug_from_name, CategoryNode,
    ProductStatus,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use offers::{
    discount_exceeds_price, discount_percent, effective_min_order_quantity, select_best_offer,
    BackorderPolicy, BestOffer, BuyBox, ContactFallback, OfferStatus, OfferTerms,
    OrderQuantityPolicy, QuantityViolation, Selection, StockStatus, VariantOfferView,
    VendorOffer, VendorOfferVariant, DEFAULT_CONTACT_LABEL, NO_ACTIVE_OFFER_MESSAGE,
};
pub use seed::{
    load_catalog_seed, parse_catalog_seed, AttributeSeed, AttributeSetSeed, CatalogSeed,
    CategorySeed, GroupSeed, NamedSeed, OptionSeed, StoreSeed,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid value type: {0}")]
    InvalidValueType(String),
    #[error("invalid product status: {0}")]
    InvalidProductStatus(String),
    #[error("invalid offer status: {0}")]
    InvalidOfferStatus(String),
    #[error("invalid stock status: {0}")]
    InvalidStockStatus(String),
    #[error("invalid backorder policy: {0}")]
    InvalidBackorderPolicy(String),
    #[error("stored attribute value has no populated column")]
    EmptyAttributeValue,
    #[error("stored attribute value populates {0} columns; exactly one is allowed")]
    AmbiguousAttributeValue(usize),
    #[error("stored attribute value does not match declared type '{expected}'")]
    AttributeTypeMismatch { expected: AttributeValueType },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog seed file: {0}")]
    SeedFileParse(#[source] serde_yaml::Error),
    #[error("catalog seed validation failed: {0}")]
    Validation(String),
}
