//! Attribute sets and their groups, attributes, and options.
//!
//! Reads assemble a [`souk_core::AttributeSchema`]; writes take the same
//! nested shape the catalog seed file uses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use souk_core::{
    effective_attribute_set, AttributeGroup, AttributeOption, AttributeSchema, AttributeSetSeed,
    AttributeValueType, ProductAttribute,
};

use crate::categories::list_category_nodes;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `attribute_sets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttributeSetRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    sort_order: i32,
}

#[derive(Debug, sqlx::FromRow)]
#[allow(clippy::struct_excessive_bools)]
struct AttributeRow {
    id: i64,
    attribute_group_id: i64,
    code: String,
    name: String,
    value_type: String,
    is_required: bool,
    is_variant_level: bool,
    is_filterable: bool,
    is_comparable: bool,
    unit: Option<String>,
    sort_order: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionRow {
    id: i64,
    attribute_id: i64,
    value: String,
    display_label: String,
    sort_order: i32,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Loads the live schema of an attribute set, or `None` when the set does
/// not exist or is deleted. Deleted groups, attributes, and options are
/// left out.
///
/// # Errors
///
/// Returns [`DbError::InvalidRow`] if a stored `value_type` is unknown, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn load_attribute_schema(
    pool: &PgPool,
    set_id: i64,
) -> Result<Option<AttributeSchema>, DbError> {
    let Some(set_name) = sqlx::query_scalar::<_, String>(
        "SELECT name FROM attribute_sets WHERE id = $1 AND is_deleted = FALSE",
    )
    .bind(set_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let groups = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name, sort_order FROM attribute_groups \
         WHERE attribute_set_id = $1 AND is_deleted = FALSE",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    let attributes = sqlx::query_as::<_, AttributeRow>(
        "SELECT a.id, a.attribute_group_id, a.code, a.name, a.value_type, a.is_required, \
                a.is_variant_level, a.is_filterable, a.is_comparable, a.unit, a.sort_order \
         FROM product_attributes a \
         JOIN attribute_groups g ON g.id = a.attribute_group_id \
         WHERE g.attribute_set_id = $1 AND g.is_deleted = FALSE AND a.is_deleted = FALSE",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, OptionRow>(
        "SELECT o.id, o.attribute_id, o.value, o.display_label, o.sort_order \
         FROM attribute_options o \
         JOIN product_attributes a ON a.id = o.attribute_id \
         JOIN attribute_groups g ON g.id = a.attribute_group_id \
         WHERE g.attribute_set_id = $1 AND o.is_deleted = FALSE",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    assemble_schema(set_id, set_name, groups, attributes, options).map(Some)
}

/// Loads the schema that applies to a category: its own attribute set, or
/// the nearest ancestor's.
///
/// Returns `None` when no category on the path carries a set.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist, or any
/// error from [`load_attribute_schema`].
pub async fn load_schema_for_category(
    pool: &PgPool,
    category_id: i64,
) -> Result<Option<AttributeSchema>, DbError> {
    let nodes = list_category_nodes(pool).await?;
    if !nodes.iter().any(|n| n.id == category_id) {
        return Err(DbError::NotFound);
    }
    match effective_attribute_set(&nodes, category_id) {
        Some(set_id) => load_attribute_schema(pool, set_id).await,
        None => Ok(None),
    }
}

fn assemble_schema(
    set_id: i64,
    set_name: String,
    groups: Vec<GroupRow>,
    attributes: Vec<AttributeRow>,
    options: Vec<OptionRow>,
) -> Result<AttributeSchema, DbError> {
    let mut options_by_attribute: HashMap<i64, Vec<AttributeOption>> = HashMap::new();
    for o in options {
        options_by_attribute
            .entry(o.attribute_id)
            .or_default()
            .push(AttributeOption {
                id: o.id,
                attribute_id: o.attribute_id,
                value: o.value,
                display_label: o.display_label,
                sort_order: o.sort_order,
            });
    }

    let mut attributes_by_group: HashMap<i64, Vec<ProductAttribute>> = HashMap::new();
    for a in attributes {
        let value_type: AttributeValueType = a.value_type.parse()?;
        attributes_by_group
            .entry(a.attribute_group_id)
            .or_default()
            .push(ProductAttribute {
                id: a.id,
                group_id: a.attribute_group_id,
                code: a.code,
                name: a.name,
                value_type,
                is_required: a.is_required,
                is_variant_level: a.is_variant_level,
                is_filterable: a.is_filterable,
                is_comparable: a.is_comparable,
                unit: a.unit,
                sort_order: a.sort_order,
                options: options_by_attribute.remove(&a.id).unwrap_or_default(),
            });
    }

    let groups = groups
        .into_iter()
        .map(|g| AttributeGroup {
            attributes: attributes_by_group.remove(&g.id).unwrap_or_default(),
            id: g.id,
            name: g.name,
            sort_order: g.sort_order,
        })
        .collect();

    Ok(AttributeSchema::new(set_id, set_name, groups))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Creates an attribute set with its groups, attributes, and options in a
/// single transaction. Sort orders follow list position.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails (a taken set name is a
/// unique violation).
pub async fn create_attribute_set(
    pool: &PgPool,
    set: &AttributeSetSeed,
) -> Result<AttributeSetRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, AttributeSetRow>(
        "INSERT INTO attribute_sets (name) VALUES ($1) \
         RETURNING id, public_id, name, created_at, updated_at, is_deleted, deleted_at, \
                   row_version",
    )
    .bind(&set.name)
    .fetch_one(&mut *tx)
    .await?;

    write_set_contents(&mut tx, row.id, set).await?;

    tx.commit().await?;
    Ok(row)
}

/// Upserts the groups, attributes, and options of `set` under `set_id`.
/// Existing rows keyed by (set, group name), (group, code), and
/// (attribute, value) are updated in place.
pub(crate) async fn write_set_contents(
    conn: &mut PgConnection,
    set_id: i64,
    set: &AttributeSetSeed,
) -> Result<(), DbError> {
    for (group_index, group) in set.groups.iter().enumerate() {
        let group_id: i64 = sqlx::query_scalar(
            "INSERT INTO attribute_groups (attribute_set_id, name, sort_order) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (attribute_set_id, name) DO UPDATE SET \
                 sort_order = EXCLUDED.sort_order, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(set_id)
        .bind(&group.name)
        .bind(sort_index(group_index))
        .fetch_one(&mut *conn)
        .await?;

        for (attribute_index, attribute) in group.attributes.iter().enumerate() {
            let attribute_id: i64 = sqlx::query_scalar(
                "INSERT INTO product_attributes \
                     (attribute_group_id, code, name, value_type, is_required, is_variant_level, \
                      is_filterable, is_comparable, unit, sort_order) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (attribute_group_id, code) DO UPDATE SET \
                     name             = EXCLUDED.name, \
                     value_type       = EXCLUDED.value_type, \
                     is_required      = EXCLUDED.is_required, \
                     is_variant_level = EXCLUDED.is_variant_level, \
                     is_filterable    = EXCLUDED.is_filterable, \
                     is_comparable    = EXCLUDED.is_comparable, \
                     unit             = EXCLUDED.unit, \
                     sort_order       = EXCLUDED.sort_order, \
                     updated_at       = NOW() \
                 RETURNING id",
            )
            .bind(group_id)
            .bind(&attribute.code)
            .bind(&attribute.name)
            .bind(attribute.value_type.as_str())
            .bind(attribute.required)
            .bind(attribute.variant_level)
            .bind(attribute.filterable)
            .bind(attribute.comparable)
            .bind(&attribute.unit)
            .bind(sort_index(attribute_index))
            .fetch_one(&mut *conn)
            .await?;

            for (option_index, option) in attribute.options.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO attribute_options \
                         (attribute_id, value, display_label, sort_order) \
                     VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (attribute_id, value) DO UPDATE SET \
                         display_label = EXCLUDED.display_label, \
                         sort_order    = EXCLUDED.sort_order, \
                         updated_at    = NOW()",
                )
                .bind(attribute_id)
                .bind(&option.value)
                .bind(&option.label)
                .bind(sort_index(option_index))
                .execute(&mut *conn)
                .await?;
            }
        }
    }
    Ok(())
}

fn sort_index(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
