//! Catalog primitives shared by the storage and HTTP layers: product
//! lifecycle status, slugs, and the self-referencing category tree.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    /// Only active products are visible on the storefront.
    #[must_use]
    pub fn is_public(self) -> bool {
        self == ProductStatus::Active
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProductStatus::Draft),
            "active" => Ok(ProductStatus::Active),
            "archived" => Ok(ProductStatus::Archived),
            other => Err(CoreError::InvalidProductStatus(other.to_string())),
        }
    }
}

/// Generate a URL-safe slug from a display name.
///
/// Non-ASCII characters are dropped, spaces become dashes, and runs of
/// dashes collapse to one.
#[must_use]
pub fn slug_from_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                Some(c)
            } else if c == ' ' || c == '_' || c == '/' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Returns `true` if `slug` is lowercase ASCII alphanumerics separated by
/// single dashes.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Minimal view of a `catalog_categories` row needed to walk the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub attribute_set_id: Option<i64>,
}

/// Returns the breadcrumb from the root down to `category_id`.
///
/// The walk stops early at a missing parent or when a cycle is detected, so
/// malformed trees still yield the partial path that was reachable. Returns
/// an empty vector when `category_id` itself is unknown.
#[must_use]
pub fn category_path(categories: &[CategoryNode], category_id: i64) -> Vec<&CategoryNode> {
    let by_id: HashMap<i64, &CategoryNode> = categories.iter().map(|c| (c.id, c)).collect();
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    let mut cursor = by_id.get(&category_id).copied();

    while let Some(node) = cursor {
        if !visited.insert(node.id) {
            break;
        }
        path.push(node);
        cursor = node.parent_id.and_then(|pid| by_id.get(&pid).copied());
    }

    path.reverse();
    path
}

/// Resolves the attribute set that governs a category: its own, or the
/// nearest ancestor's when it has none.
#[must_use]
pub fn effective_attribute_set(categories: &[CategoryNode], category_id: i64) -> Option<i64> {
    category_path(categories, category_id)
        .iter()
        .rev()
        .find_map(|c| c.attribute_set_id)
}
