//! Pass 1: Omission & Normalization
//!
//! - Drops every typed node whose normalized path is listed in `omit`,
//!   together with its whole subtree.
//! - Collapses multi-valued declared types (`["objectId", "null"]`) to their
//!   first entry. Elasticsearch has no union types, so each field commits to
//!   one concrete type.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::schema_utils::{has_declared_type, BSON_TYPE};
use crate::walker::map;

/// Apply omission and type normalization.
pub fn omit_and_normalize(schema: &Value, omit: &[String]) -> Value {
    let omit: HashSet<&str> = omit.iter().map(String::as_str).collect();

    map(schema, &mut |node| {
        if !has_declared_type(&node.value) {
            return Some(node.value);
        }

        let path = node.normalized_path_string();
        if !path.is_empty() && omit.contains(path.as_str()) {
            tracing::debug!(path = %path, "omitting field");
            return None;
        }

        let mut value = node.value;
        if let Some(obj) = value.as_object_mut() {
            collapse_type_list(obj);
        }
        Some(value)
    })
    .unwrap_or_else(|| Value::Object(Map::new()))
}

fn collapse_type_list(obj: &mut Map<String, Value>) {
    let first = match obj.get(BSON_TYPE) {
        Some(Value::Array(types)) => types.first().cloned(),
        _ => None,
    };
    if let Some(first) = first {
        obj.insert(BSON_TYPE.to_string(), first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "bsonType": "object",
            "additionalProperties": false,
            "properties": {
                "parentId": { "bsonType": ["objectId", "null"] },
                "integrations": {
                    "bsonType": "object",
                    "properties": { "stripe": { "bsonType": "string" } }
                },
                "addresses": {
                    "bsonType": "array",
                    "items": {
                        "bsonType": "object",
                        "properties": {
                            "zip": { "bsonType": "string" },
                            "city": { "bsonType": "string" }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_collapses_type_lists() {
        let result = omit_and_normalize(&schema(), &[]);
        assert_eq!(result["properties"]["parentId"]["bsonType"], json!("objectId"));
    }

    #[test]
    fn test_omits_top_level_subtree() {
        let result = omit_and_normalize(&schema(), &["integrations".to_string()]);
        let props = result["properties"].as_object().unwrap();
        assert!(!props.contains_key("integrations"));
        assert!(props.contains_key("parentId"));
    }

    #[test]
    fn test_omits_inside_arrays_by_normalized_path() {
        let result = omit_and_normalize(&schema(), &["addresses.zip".to_string()]);
        let item_props = result["properties"]["addresses"]["items"]["properties"]
            .as_object()
            .unwrap();
        assert!(!item_props.contains_key("zip"));
        assert!(item_props.contains_key("city"));
    }

    #[test]
    fn test_omitting_array_removes_items_too() {
        let result = omit_and_normalize(&schema(), &["addresses".to_string()]);
        assert!(result["properties"].get("addresses").is_none());
    }

    #[test]
    fn test_untyped_nodes_pass_through() {
        let schema = json!({"properties": {"note": {"description": "free text"}}});
        assert_eq!(omit_and_normalize(&schema, &["note".to_string()]), schema);
    }
}
