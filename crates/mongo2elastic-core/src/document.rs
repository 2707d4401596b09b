//! Document reshaping before indexing.
//!
//! Documents must line up with the mapping produced by [`crate::convert`], so
//! the mapper applies the same rename map the schema went through: the
//! default `_id → _mongoId` plus the caller's entries. The root id is
//! stringified on the way, since the mapping declares it as a keyword. Rename
//! paths are the same normalized dotted paths used for the schema, so a path
//! crossing an array is applied to every element.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ConvertError;
use crate::passes::p2_rename::{default_renames, validate_prefixes};
use crate::path_utils::split_path;

/// Root id field of a MongoDB document.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldRename {
    parent: Vec<String>,
    from: String,
    to: String,
}

/// Applies the id and field renames to documents.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    renames: Vec<FieldRename>,
}

impl Default for DocumentMapper {
    /// Only the default `_id` rename.
    fn default() -> Self {
        Self::from_renames(&default_renames())
    }
}

impl DocumentMapper {
    /// Build a mapper from the caller's rename map, merged over the default
    /// the same way [`crate::convert`] merges it. The merged map is checked
    /// like the schema rename pass checks it, so a mapper can only exist for
    /// renames that also convert.
    pub fn new(rename: &BTreeMap<String, String>) -> Result<Self, ConvertError> {
        let mut merged = default_renames();
        merged.extend(rename.iter().map(|(old, new)| (old.clone(), new.clone())));
        validate_prefixes(&merged)?;
        Ok(Self::from_renames(&merged))
    }

    fn from_renames(rename: &BTreeMap<String, String>) -> Self {
        let mut renames: Vec<FieldRename> = rename
            .iter()
            .filter_map(|(old, new)| {
                let mut parent = split_path(old);
                let from = parent.pop()?;
                let to = split_path(new).pop()?;
                (from != to).then_some(FieldRename { parent, from, to })
            })
            .collect();
        // Deepest first, so a renamed parent does not hide its children's paths.
        renames.sort_by(|a, b| b.parent.len().cmp(&a.parent.len()));
        Self { renames }
    }

    /// Reshape one document.
    pub fn map(&self, mut document: Value) -> Value {
        if let Some(id) = document.get_mut(ID_FIELD) {
            if let Some(text) = id_to_string(id) {
                *id = Value::String(text);
            }
        }
        for rename in &self.renames {
            rename_at(&mut document, &rename.parent, &rename.from, &rename.to);
        }
        // Elasticsearch rejects `_id` inside the document source.
        if let Some(obj) = document.as_object_mut() {
            obj.shift_remove(ID_FIELD);
        }
        document
    }
}

/// Stringify a document id. Extended JSON ObjectIds (`{"$oid": "..."}`)
/// yield their hex string.
pub fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => match obj.get("$oid") {
            Some(Value::String(oid)) => Some(oid.clone()),
            _ => Some(id.to_string()),
        },
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn rename_at(value: &mut Value, parent: &[String], from: &str, to: &str) {
    match value {
        Value::Array(items) => {
            for item in items {
                rename_at(item, parent, from, to);
            }
        }
        Value::Object(obj) => match parent.split_first() {
            Some((head, rest)) => {
                if let Some(child) = obj.get_mut(head) {
                    rename_at(child, rest, from, to);
                }
            }
            None => {
                if let Some(moved) = obj.shift_remove(from) {
                    obj.insert(to.to_string(), moved);
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapper(pairs: &[(&str, &str)]) -> DocumentMapper {
        let map = pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        DocumentMapper::new(&map).unwrap()
    }

    #[test]
    fn test_root_id_moves_to_mongo_id() {
        let doc = json!({ "_id": "abc", "name": "x", "owner": { "_id": "o1" } });
        let mapped = DocumentMapper::default().map(doc);
        assert_eq!(
            mapped,
            json!({ "name": "x", "owner": { "_id": "o1" }, "_mongoId": "abc" })
        );
    }

    #[test]
    fn test_object_id_is_stringified() {
        let mapped = mapper(&[]).map(json!({ "_id": { "$oid": "64b0f1" }, "n": 1 }));
        assert_eq!(mapped, json!({ "n": 1, "_mongoId": "64b0f1" }));
    }

    #[test]
    fn test_caller_id_rename_wins() {
        let m = mapper(&[("_id", "mongoId")]);
        assert_eq!(m.map(json!({ "_id": 7 })), json!({ "mongoId": "7" }));
    }

    #[test]
    fn test_identity_id_rename_still_drops_id() {
        let m = mapper(&[("_id", "_id")]);
        assert_eq!(m.map(json!({ "_id": 7, "n": 1 })), json!({ "n": 1 }));
    }

    #[test]
    fn test_id_to_string() {
        assert_eq!(id_to_string(&json!({ "$oid": "ab" })).as_deref(), Some("ab"));
        assert_eq!(id_to_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(id_to_string(&Value::Null), None);
    }

    #[test]
    fn test_renames_nested_field() {
        let m = mapper(&[("meta.numberOfEmployees", "meta.numEmployees")]);
        let mapped = m.map(json!({ "meta": { "numberOfEmployees": 5, "other": 1 } }));
        assert_eq!(mapped, json!({ "meta": { "other": 1, "numEmployees": 5 } }));
    }

    #[test]
    fn test_renames_inside_arrays() {
        let m = mapper(&[("addresses.address.address1", "addresses.address.street")]);
        let mapped = m.map(json!({ "addresses": [
            { "address": { "address1": "1 Main" } },
            { "address": { "city": "Boston" } }
        ]}));
        assert_eq!(
            mapped,
            json!({ "addresses": [
                { "address": { "street": "1 Main" } },
                { "address": { "city": "Boston" } }
            ]})
        );
    }

    #[test]
    fn test_parent_and_child_renamed_together() {
        let m = mapper(&[("integrations", "apps"), ("integrations.stripe", "integrations.billing")]);
        let mapped = m.map(json!({ "integrations": { "stripe": { "priceId": "p1" } } }));
        assert_eq!(mapped, json!({ "apps": { "billing": { "priceId": "p1" } } }));
    }

    #[test]
    fn test_missing_path_is_noop() {
        let m = mapper(&[("a.b", "a.c")]);
        assert_eq!(m.map(json!({ "a": 1 })), json!({ "a": 1 }));
    }

    #[test]
    fn test_rejects_prefix_change() {
        let map = [("a.b".to_string(), "x.b".to_string())].into();
        assert!(matches!(
            DocumentMapper::new(&map),
            Err(ConvertError::RenamePrefixMismatch { .. })
        ));
    }
}
