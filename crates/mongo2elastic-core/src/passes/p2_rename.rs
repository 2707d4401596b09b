//! Pass 2: Field Renaming
//!
//! Renames schema properties before conversion so the mapping is produced
//! under the new names. A rename may only change the leaf segment of a path:
//!
//! - `addresses.address.address1 → addresses.address.street` is allowed.
//! - `integrations.stripe → foo.bar` fails with
//!   [`ConvertError::RenamePrefixMismatch`].
//!
//! A rename whose new leaf already exists next to the source property fails
//! with [`ConvertError::RenameCollision`]. All entries are validated before
//! the tree is touched; entries whose source does not exist are ignored.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::error::ConvertError;
use crate::path_utils::{build_pointer, join_path, parent_segments, split_path, PROPERTIES};
use crate::walker::{schema_children, walk};

/// Name the document root `_id` is always renamed to, so it cannot clash with
/// Elasticsearch's own `_id` metadata field.
pub const MONGO_ID_FIELD: &str = "_mongoId";

/// The default rename map, `{"_id": "_mongoId"}`.
pub fn default_renames() -> BTreeMap<String, String> {
    BTreeMap::from([("_id".to_string(), MONGO_ID_FIELD.to_string())])
}

/// A validated, not yet applied, rename of one property.
#[derive(Debug, Clone, PartialEq)]
struct PlannedRename {
    /// Raw path of the object node owning the `properties` map.
    container: Vec<String>,
    from: String,
    to: String,
}

/// Reject any entry that changes more than the leaf segment.
pub fn validate_prefixes(rename: &BTreeMap<String, String>) -> Result<(), ConvertError> {
    for (old, new) in rename {
        let old_segments = split_path(old);
        let new_segments = split_path(new);
        if old_segments.len() != new_segments.len()
            || parent_segments(&old_segments) != parent_segments(&new_segments)
        {
            return Err(ConvertError::RenamePrefixMismatch { path: old.clone() });
        }
    }
    Ok(())
}

/// Validate and apply `rename` to the schema.
pub fn rename_fields(
    mut schema: Value,
    rename: &BTreeMap<String, String>,
) -> Result<Value, ConvertError> {
    if rename.is_empty() {
        return Ok(schema);
    }
    validate_prefixes(rename)?;

    let plan = plan_renames(&schema, rename)?;

    // Pre-order plan reversed: descendants are renamed before their ancestors,
    // so every container pointer is still valid when it is used.
    for planned in plan.into_iter().rev() {
        let mut segments = planned.container.clone();
        segments.push(PROPERTIES.to_string());
        let pointer = build_pointer(&segments);
        let Some(props) = schema.pointer_mut(&pointer).and_then(Value::as_object_mut) else {
            continue;
        };
        if let Some(value) = props.shift_remove(&planned.from) {
            tracing::debug!(from = %planned.from, to = %planned.to, "renaming field");
            props.insert(planned.to, value);
        }
    }

    Ok(schema)
}

/// Walk every object node and collect the renames that apply to its direct
/// properties, rejecting any rename onto an existing or already claimed name.
fn plan_renames(
    schema: &Value,
    rename: &BTreeMap<String, String>,
) -> Result<Vec<PlannedRename>, ConvertError> {
    let mut plan = Vec::new();

    walk(schema, &schema_children, &mut |visit| {
        let Some(props) = visit.value.get(PROPERTIES).and_then(Value::as_object) else {
            return Ok(());
        };
        let base = visit.normalized_path();
        let mut claimed: HashSet<String> = HashSet::new();

        for name in props.keys() {
            let mut segments = base.clone();
            segments.push(name.clone());
            let old = join_path(&segments);

            let Some(new) = rename.get(&old) else {
                continue;
            };
            let new_leaf = split_path(new).pop().unwrap_or_default();
            if new_leaf == *name {
                continue;
            }
            if props.contains_key(&new_leaf) || claimed.contains(&new_leaf) {
                return Err(ConvertError::RenameCollision {
                    path: old,
                    destination: new.clone(),
                    property: new_leaf,
                });
            }
            claimed.insert(new_leaf.clone());
            plan.push(PlannedRename {
                container: visit.path.to_vec(),
                from: name.clone(),
                to: new_leaf,
            });
        }
        Ok(())
    })?;

    Ok(plan)
}
