//! Attribute-set schema and the entity-attribute-value model for product
//! specifications.
//!
//! Storage keeps one wide row per value (`raw_value`, `numeric_value`,
//! `bool_value`, `datetime_value`, `option_id`); the application works with
//! [`AttributeValue`], which makes the "exactly one column" rule a type.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValueType {
    Text,
    Number,
    Bool,
    Date,
    Option,
}

impl AttributeValueType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeValueType::Text => "text",
            AttributeValueType::Number => "number",
            AttributeValueType::Bool => "bool",
            AttributeValueType::Date => "date",
            AttributeValueType::Option => "option",
        }
    }
}

impl std::fmt::Display for AttributeValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttributeValueType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(AttributeValueType::Text),
            "number" => Ok(AttributeValueType::Number),
            "bool" => Ok(AttributeValueType::Bool),
            "date" => Ok(AttributeValueType::Date),
            "option" => Ok(AttributeValueType::Option),
            other => Err(CoreError::InvalidValueType(other.to_string())),
        }
    }
}

/// A typed attribute value.
///
/// Serialized as `{"type": "number", "value": "15.6"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Date(DateTime<Utc>),
    /// Id of an `attribute_options` row.
    Option(i64),
}

/// The wide-column storage shape of a `product_attribute_values` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttributeValue {
    pub raw_value: Option<String>,
    pub numeric_value: Option<Decimal>,
    pub bool_value: Option<bool>,
    pub datetime_value: Option<DateTime<Utc>>,
    pub option_id: Option<i64>,
}

impl StoredAttributeValue {
    #[must_use]
    pub fn populated_count(&self) -> usize {
        [
            self.raw_value.is_some(),
            self.numeric_value.is_some(),
            self.bool_value.is_some(),
            self.datetime_value.is_some(),
            self.option_id.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

impl AttributeValue {
    #[must_use]
    pub fn value_type(&self) -> AttributeValueType {
        match self {
            AttributeValue::Text(_) => AttributeValueType::Text,
            AttributeValue::Number(_) => AttributeValueType::Number,
            AttributeValue::Bool(_) => AttributeValueType::Bool,
            AttributeValue::Date(_) => AttributeValueType::Date,
            AttributeValue::Option(_) => AttributeValueType::Option,
        }
    }

    #[must_use]
    pub fn to_stored(&self) -> StoredAttributeValue {
        let mut stored = StoredAttributeValue::default();
        match self {
            AttributeValue::Text(s) => stored.raw_value = Some(s.clone()),
            AttributeValue::Number(n) => stored.numeric_value = Some(*n),
            AttributeValue::Bool(b) => stored.bool_value = Some(*b),
            AttributeValue::Date(d) => stored.datetime_value = Some(*d),
            AttributeValue::Option(id) => stored.option_id = Some(*id),
        }
        stored
    }

    /// Rebuild a typed value from its storage row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyAttributeValue`] or
    /// [`CoreError::AmbiguousAttributeValue`] when the row does not populate
    /// exactly one column, and [`CoreError::AttributeTypeMismatch`] when the
    /// populated column disagrees with `expected`.
    pub fn from_stored(
        expected: AttributeValueType,
        stored: &StoredAttributeValue,
    ) -> Result<Self, CoreError> {
        match stored.populated_count() {
            0 => return Err(CoreError::EmptyAttributeValue),
            1 => {}
            n => return Err(CoreError::AmbiguousAttributeValue(n)),
        }

        let value = match expected {
            AttributeValueType::Text => stored.raw_value.clone().map(AttributeValue::Text),
            AttributeValueType::Number => stored.numeric_value.map(AttributeValue::Number),
            AttributeValueType::Bool => stored.bool_value.map(AttributeValue::Bool),
            AttributeValueType::Date => stored.datetime_value.map(AttributeValue::Date),
            AttributeValueType::Option => stored.option_id.map(AttributeValue::Option),
        };
        value.ok_or(CoreError::AttributeTypeMismatch { expected })
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOption {
    pub id: i64,
    pub attribute_id: i64,
    pub value: String,
    pub display_label: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub id: i64,
    pub group_id: i64,
    pub code: String,
    pub name: String,
    pub value_type: AttributeValueType,
    pub is_required: bool,
    pub is_variant_level: bool,
    pub is_filterable: bool,
    pub is_comparable: bool,
    pub unit: Option<String>,
    pub sort_order: i32,
    pub options: Vec<AttributeOption>,
}

impl ProductAttribute {
    #[must_use]
    pub fn option(&self, option_id: i64) -> Option<&AttributeOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub id: i64,
    pub name: String,
    pub sort_order: i32,
    pub attributes: Vec<ProductAttribute>,
}

/// The attribute set attached to a category, with its groups, attributes,
/// and options in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub set_id: i64,
    pub set_name: String,
    pub groups: Vec<AttributeGroup>,
}

impl AttributeSchema {
    /// Build a schema, ordering every level by `(sort_order, id)`.
    #[must_use]
    pub fn new(set_id: i64, set_name: impl Into<String>, mut groups: Vec<AttributeGroup>) -> Self {
        groups.sort_by_key(|g| (g.sort_order, g.id));
        for group in &mut groups {
            group.attributes.sort_by_key(|a| (a.sort_order, a.id));
            for attribute in &mut group.attributes {
                attribute.options.sort_by_key(|o| (o.sort_order, o.id));
            }
        }
        Self {
            set_id,
            set_name: set_name.into(),
            groups,
        }
    }

    /// All attributes in display order: group order first, then attribute
    /// order within the group.
    #[must_use]
    pub fn applicable_attributes(&self) -> Vec<&ProductAttribute> {
        self.groups.iter().flat_map(|g| g.attributes.iter()).collect()
    }

    #[must_use]
    pub fn product_level(&self) -> Vec<&ProductAttribute> {
        self.applicable_attributes()
            .into_iter()
            .filter(|a| !a.is_variant_level)
            .collect()
    }

    #[must_use]
    pub fn variant_level(&self) -> Vec<&ProductAttribute> {
        self.applicable_attributes()
            .into_iter()
            .filter(|a| a.is_variant_level)
            .collect()
    }

    #[must_use]
    pub fn filterable(&self) -> Vec<&ProductAttribute> {
        self.applicable_attributes()
            .into_iter()
            .filter(|a| a.is_filterable)
            .collect()
    }

    #[must_use]
    pub fn attribute(&self, attribute_id: i64) -> Option<&ProductAttribute> {
        self.groups
            .iter()
            .flat_map(|g| g.attributes.iter())
            .find(|a| a.id == attribute_id)
    }

    fn group_of(&self, attribute_id: i64) -> Option<&AttributeGroup> {
        self.groups
            .iter()
            .find(|g| g.attributes.iter().any(|a| a.id == attribute_id))
    }

    /// Position of an attribute in display order; unknown ids sort last.
    fn position(&self, attribute_id: i64) -> usize {
        self.applicable_attributes()
            .iter()
            .position(|a| a.id == attribute_id)
            .unwrap_or(usize::MAX)
    }
}

// ---------------------------------------------------------------------------
// Validation (write path)
// ---------------------------------------------------------------------------

/// One value submitted for a product, optionally scoped to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInput {
    pub attribute_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    UnknownAttribute {
        attribute_id: i64,
    },
    UnknownVariant {
        attribute_code: String,
        variant_id: i64,
    },
    TypeMismatch {
        attribute_code: String,
        expected: AttributeValueType,
        actual: AttributeValueType,
    },
    ForeignOption {
        attribute_code: String,
        option_id: i64,
    },
    BlankText {
        attribute_code: String,
    },
    VariantValueOnProductAttribute {
        attribute_code: String,
        variant_id: i64,
    },
    MissingVariantForVariantAttribute {
        attribute_code: String,
    },
    Duplicate {
        attribute_code: String,
        variant_id: Option<i64>,
    },
    MissingRequired {
        attribute_code: String,
        variant_id: Option<i64>,
    },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::UnknownAttribute { attribute_id } => {
                write!(f, "attribute {attribute_id} is not part of the category's attribute set")
            }
            ValidationIssue::UnknownVariant {
                attribute_code,
                variant_id,
            } => write!(
                f,
                "'{attribute_code}' targets variant {variant_id}, \
                 which does not belong to the product"
            ),
            ValidationIssue::TypeMismatch {
                attribute_code,
                expected,
                actual,
            } => write!(f, "'{attribute_code}' expects a {expected} value, got {actual}"),
            ValidationIssue::ForeignOption {
                attribute_code,
                option_id,
            } => write!(f, "option {option_id} is not an option of '{attribute_code}'"),
            ValidationIssue::BlankText { attribute_code } => {
                write!(f, "'{attribute_code}' must not be blank")
            }
            ValidationIssue::VariantValueOnProductAttribute {
                attribute_code,
                variant_id,
            } => write!(
                f,
                "'{attribute_code}' is product-level but was given for variant {variant_id}"
            ),
            ValidationIssue::MissingVariantForVariantAttribute { attribute_code } => {
                write!(f, "'{attribute_code}' is variant-level and needs a variant_id")
            }
            ValidationIssue::Duplicate {
                attribute_code,
                variant_id: Some(v),
            } => write!(f, "'{attribute_code}' given more than once for variant {v}"),
            ValidationIssue::Duplicate {
                attribute_code,
                variant_id: None,
            } => write!(f, "'{attribute_code}' given more than once"),
            ValidationIssue::MissingRequired {
                attribute_code,
                variant_id: Some(v),
            } => write!(f, "'{attribute_code}' is required for variant {v}"),
            ValidationIssue::MissingRequired {
                attribute_code,
                variant_id: None,
            } => write!(f, "'{attribute_code}' is required"),
        }
    }
}

/// Check a full set of submitted values for a product against its schema.
///
/// `variant_ids` lists the product's live variants. Every problem found is
/// reported rather than only the first.
///
/// # Errors
///
/// Returns the list of [`ValidationIssue`]s when any check fails.
pub fn validate_values(
    schema: &AttributeSchema,
    inputs: &[AttributeInput],
    variant_ids: &[i64],
) -> Result<(), Vec<ValidationIssue>> {
    let known_variants: HashSet<i64> = variant_ids.iter().copied().collect();
    let mut issues = Vec::new();
    let mut seen: HashSet<(i64, Option<i64>)> = HashSet::new();

    for input in inputs {
        let Some(attribute) = schema.attribute(input.attribute_id) else {
            issues.push(ValidationIssue::UnknownAttribute {
                attribute_id: input.attribute_id,
            });
            continue;
        };
        let code = || attribute.code.clone();

        match (attribute.is_variant_level, input.variant_id) {
            (false, Some(variant_id)) => {
                issues.push(ValidationIssue::VariantValueOnProductAttribute {
                    attribute_code: code(),
                    variant_id,
                });
            }
            (true, None) => issues.push(ValidationIssue::MissingVariantForVariantAttribute {
                attribute_code: code(),
            }),
            (true, Some(variant_id)) if !known_variants.contains(&variant_id) => {
                issues.push(ValidationIssue::UnknownVariant {
                    attribute_code: code(),
                    variant_id,
                });
            }
            _ => {}
        }

        if !seen.insert((input.attribute_id, input.variant_id)) {
            issues.push(ValidationIssue::Duplicate {
                attribute_code: code(),
                variant_id: input.variant_id,
            });
        }

        let actual = input.value.value_type();
        if actual != attribute.value_type {
            issues.push(ValidationIssue::TypeMismatch {
                attribute_code: code(),
                expected: attribute.value_type,
                actual,
            });
            continue;
        }

        match &input.value {
            AttributeValue::Option(option_id) if attribute.option(*option_id).is_none() => {
                issues.push(ValidationIssue::ForeignOption {
                    attribute_code: code(),
                    option_id: *option_id,
                });
            }
            AttributeValue::Text(text) if text.trim().is_empty() => {
                issues.push(ValidationIssue::BlankText {
                    attribute_code: code(),
                });
            }
            _ => {}
        }
    }

    for attribute in schema.applicable_attributes() {
        if !attribute.is_required {
            continue;
        }
        if attribute.is_variant_level {
            for variant_id in variant_ids {
                if !seen.contains(&(attribute.id, Some(*variant_id))) {
                    issues.push(ValidationIssue::MissingRequired {
                        attribute_code: attribute.code.clone(),
                        variant_id: Some(*variant_id),
                    });
                }
            }
        } else if !seen.contains(&(attribute.id, None)) {
            issues.push(ValidationIssue::MissingRequired {
                attribute_code: attribute.code.clone(),
                variant_id: None,
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

// ---------------------------------------------------------------------------
// Resolution (read path)
// ---------------------------------------------------------------------------

/// A stored value as read back from `product_attribute_values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttributeRow {
    pub attribute_id: i64,
    pub variant_id: Option<i64>,
    pub stored: StoredAttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOption {
    pub id: i64,
    pub value: String,
    pub display_label: String,
}

/// A stored value joined with its attribute definition, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAttributeValue {
    pub attribute_id: i64,
    pub attribute_code: String,
    pub attribute_name: String,
    pub group_name: String,
    pub variant_id: Option<i64>,
    pub value: AttributeValue,
    pub option: Option<ResolvedOption>,
    pub unit: Option<String>,
    pub display: String,
}

/// A stored row that could not be resolved against the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedValue {
    pub attribute_id: i64,
    pub variant_id: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedValues {
    pub values: Vec<ResolvedAttributeValue>,
    pub skipped: Vec<SkippedValue>,
}

/// Join stored rows with the schema and render display text.
///
/// Output follows schema display order, with product-level values ahead of
/// variant values for the same attribute. Rows for attributes outside the
/// schema, malformed rows, and dangling option ids land in `skipped`.
#[must_use]
pub fn resolve_values(schema: &AttributeSchema, rows: &[StoredAttributeRow]) -> ResolvedValues {
    let mut out = ResolvedValues::default();

    for row in rows {
        let skip = |reason: String| SkippedValue {
            attribute_id: row.attribute_id,
            variant_id: row.variant_id,
            reason,
        };

        let Some(attribute) = schema.attribute(row.attribute_id) else {
            out.skipped
                .push(skip("attribute is not part of the schema".to_string()));
            continue;
        };

        let value = match AttributeValue::from_stored(attribute.value_type, &row.stored) {
            Ok(v) => v,
            Err(e) => {
                out.skipped.push(skip(e.to_string()));
                continue;
            }
        };

        let option = match &value {
            AttributeValue::Option(option_id) => match attribute.option(*option_id) {
                Some(o) => Some(ResolvedOption {
                    id: o.id,
                    value: o.value.clone(),
                    display_label: o.display_label.clone(),
                }),
                None => {
                    out.skipped
                        .push(skip(format!("option {option_id} does not exist")));
                    continue;
                }
            },
            _ => None,
        };

        let display = render_display(&value, option.as_ref(), attribute.unit.as_deref());
        let group_name = schema
            .group_of(attribute.id)
            .map(|g| g.name.clone())
            .unwrap_or_default();

        out.values.push(ResolvedAttributeValue {
            attribute_id: attribute.id,
            attribute_code: attribute.code.clone(),
            attribute_name: attribute.name.clone(),
            group_name,
            variant_id: row.variant_id,
            value,
            option,
            unit: attribute.unit.clone(),
            display,
        });
    }

    let positions: HashMap<i64, usize> = out
        .values
        .iter()
        .map(|v| (v.attribute_id, schema.position(v.attribute_id)))
        .collect();
    out.values.sort_by_key(|v| {
        (
            positions.get(&v.attribute_id).copied().unwrap_or(usize::MAX),
            v.variant_id,
        )
    });
    out
}

fn render_display(
    value: &AttributeValue,
    option: Option<&ResolvedOption>,
    unit: Option<&str>,
) -> String {
    let base = match value {
        AttributeValue::Text(s) => s.clone(),
        AttributeValue::Number(n) => n.normalize().to_string(),
        AttributeValue::Bool(true) => "Yes".to_string(),
        AttributeValue::Bool(false) => "No".to_string(),
        AttributeValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        AttributeValue::Option(_) => option.map(|o| o.display_label.clone()).unwrap_or_default(),
    };
    match (value, unit) {
        (AttributeValue::Number(_), Some(unit)) if !unit.is_empty() => format!("{base} {unit}"),
        _ => base,
    }
}

#[cfg(test)]
#[path = "attributes_test.rs"]
mod tests;
