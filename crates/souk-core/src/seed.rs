//! Catalog seed file: the YAML document `souk-cli db seed` loads into an
//! empty or existing database.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeValueType;
use crate::catalog::slug_from_name;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSeed {
    pub name: String,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    pub support_phone: Option<String>,
    pub contact_to_buy_label: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedSeed {
    pub name: String,
    /// Explicit slug; derived from `name` when absent.
    pub slug: Option<String>,
}

impl NamedSeed {
    #[must_use]
    pub fn slug(&self) -> String {
        self.slug
            .clone()
            .unwrap_or_else(|| slug_from_name(&self.name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSeed {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AttributeSeed {
    pub code: String,
    pub name: String,
    pub value_type: AttributeValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub variant_level: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub comparable: bool,
    pub unit: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeed {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSetSeed {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<GroupSeed>,
}

impl AttributeSetSeed {
    /// Check one set on its own, as submitted through the admin API.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "attribute set name must be non-empty".to_string(),
            ));
        }
        validate_attribute_set(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub slug: Option<String>,
    /// Slug of a category listed earlier in the file.
    pub parent: Option<String>,
    /// Name of an attribute set in the same file.
    pub attribute_set: Option<String>,
}

impl CategorySeed {
    #[must_use]
    pub fn slug(&self) -> String {
        self.slug
            .clone()
            .unwrap_or_else(|| slug_from_name(&self.name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSeed {
    pub store: Option<StoreSeed>,
    #[serde(default)]
    pub brands: Vec<NamedSeed>,
    #[serde(default)]
    pub vendors: Vec<NamedSeed>,
    #[serde(default)]
    pub attribute_sets: Vec<AttributeSetSeed>,
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
}

/// Load and validate a catalog seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog_seed(path: &Path) -> Result<CatalogSeed, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog_seed(&content)
}

/// Parse and validate seed YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the document cannot be parsed or fails validation.
pub fn parse_catalog_seed(content: &str) -> Result<CatalogSeed, ConfigError> {
    let seed: CatalogSeed = serde_yaml::from_str(content).map_err(ConfigError::SeedFileParse)?;
    validate_seed(&seed)?;
    Ok(seed)
}

fn validate_named(kind: &str, items: &[NamedSeed]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for item in items {
        if item.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{kind} name must be non-empty"
            )));
        }
        let slug = item.slug();
        if !crate::catalog::is_valid_slug(&slug) {
            return Err(ConfigError::Validation(format!(
                "{kind} '{}' has invalid slug '{slug}'",
                item.name
            )));
        }
        if !seen.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {kind} slug: '{slug}' (from {kind} '{}')",
                item.name
            )));
        }
    }
    Ok(())
}

fn validate_attribute_set(set: &AttributeSetSeed) -> Result<(), ConfigError> {
    let mut codes = HashSet::new();
    for group in &set.groups {
        if group.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "attribute set '{}' has a group without a name",
                set.name
            )));
        }
        for attribute in &group.attributes {
            if attribute.code.trim().is_empty() || attribute.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "attribute set '{}' has an attribute without a code or name",
                    set.name
                )));
            }
            if !codes.insert(attribute.code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate attribute code '{}' in set '{}'",
                    attribute.code, set.name
                )));
            }
            let is_option = attribute.value_type == AttributeValueType::Option;
            if is_option && attribute.options.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "option attribute '{}' must list at least one option",
                    attribute.code
                )));
            }
            if !is_option && !attribute.options.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "attribute '{}' is {} and cannot have options",
                    attribute.code, attribute.value_type
                )));
            }
            let mut values = HashSet::new();
            for option in &attribute.options {
                if !values.insert(option.value.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "duplicate option value '{}' on attribute '{}'",
                        option.value, attribute.code
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_seed(seed: &CatalogSeed) -> Result<(), ConfigError> {
    validate_named("brand", &seed.brands)?;
    validate_named("vendor", &seed.vendors)?;

    let mut set_names = HashSet::new();
    for set in &seed.attribute_sets {
        set.validate()?;
        if !set_names.insert(set.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate attribute set: '{}'",
                set.name
            )));
        }
    }

    let mut category_slugs = HashSet::new();
    for category in &seed.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        if let Some(parent) = &category.parent {
            if !category_slugs.contains(parent) {
                return Err(ConfigError::Validation(format!(
                    "category '{}' references parent '{parent}' that is not defined above it",
                    category.name
                )));
            }
        }
        if let Some(set) = &category.attribute_set {
            if !set_names.contains(set.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "category '{}' references unknown attribute set '{set}'",
                    category.name
                )));
            }
        }
        let slug = category.slug();
        if !category_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category slug: '{slug}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
