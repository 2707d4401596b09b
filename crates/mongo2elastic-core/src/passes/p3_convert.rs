//! Pass 3: Override & Conversion
//!
//! Turns the (preprocessed, pruned, renamed) schema into an Elasticsearch
//! mapping. For every typed node:
//!
//! 1. Fold the override rules whose glob matches the node's normalized path:
//!    `value = { ...transform(value, path), ...literal_fields }`. Later rules
//!    see the output of earlier ones.
//! 2. Pick the passthrough fields (`type`, `fields`, `copy_to` plus the
//!    caller's list) from the overridden node.
//! 3. Resolve the node's [`SchemaKind`] to a mapping:
//!
//! | Kind             | Mapping                                               |
//! |------------------|-------------------------------------------------------|
//! | ClosedObject     | `{properties}` of the converted children              |
//! | OpenObject       | `{type: flattened}` + passthrough                     |
//! | EnumeratedScalar | `{type: keyword}` + passthrough                       |
//! | Scalar           | table type (`text` expanded, deep-merged) + passthrough |
//! | Array            | the resolved item, merged as above; `nested` wraps object items |
//! | Unknown          | passthrough alone, or nothing                         |
//!
//! Elasticsearch has no array type, so arrays are unwrapped. Array items share
//! the array's normalized path and are not matched against the rules a second
//! time.

use serde_json::{json, Map, Value};

use crate::config::OverrideRule;
use crate::error::ConvertError;
use crate::glob::GlobPattern;
use crate::path_utils::{join_path, PROPERTIES};
use crate::schema_utils::{classify, declared_type, deep_merge, is_nested, SchemaKind, NESTED_FLAG};
use crate::type_table::{expanded_text_type, FLATTENED, KEYWORD, NESTED, TEXT};

/// Side fields always copied into the mapping.
pub const DEFAULT_PASSTHROUGH: &[&str] = &["type", "fields", "copy_to"];

/// An override rule with its glob compiled.
#[derive(Debug)]
pub struct CompiledRule<'o> {
    glob: GlobPattern,
    rule: &'o OverrideRule,
}

/// Compile every rule's glob. Any invalid pattern fails the whole conversion.
pub fn compile_rules(rules: &[OverrideRule]) -> Result<Vec<CompiledRule<'_>>, ConvertError> {
    rules
        .iter()
        .map(|rule| {
            Ok(CompiledRule {
                glob: GlobPattern::compile(&rule.path)?,
                rule,
            })
        })
        .collect()
}

/// Convert a schema into a mapping.
///
/// The root is treated as a closed object when it has `properties` but no
/// declared type. A root that resolves to nothing yields `{}`.
pub fn convert_schema(schema: &Value, rules: &[CompiledRule<'_>], passthrough: &[String]) -> Value {
    let converter = Converter::new(rules, passthrough);
    let mut path = Vec::new();

    if let Some(root) = schema.as_object() {
        if declared_type(root).is_none() {
            if let Some(props) = root.get(PROPERTIES).and_then(Value::as_object) {
                let children = converter.convert_properties(props, &mut path);
                return Resolved::Container(children).into_value();
            }
        }
    }

    converter
        .convert_node(schema, &mut path)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Shape of a resolved node, before it is turned back into JSON.
#[derive(Debug)]
enum Resolved {
    /// `{properties}` only.
    Container(Map<String, Value>),
    /// `{type: nested, properties}`.
    Nested(Map<String, Value>),
    /// A typed field (or a bare passthrough object).
    Leaf(Map<String, Value>),
}

impl Resolved {
    fn into_value(self) -> Value {
        match self {
            Resolved::Container(props) => json!({ "properties": props }),
            Resolved::Nested(props) => json!({ "type": NESTED, "properties": props }),
            Resolved::Leaf(obj) => Value::Object(obj),
        }
    }
}

struct Converter<'c, 'o> {
    rules: &'c [CompiledRule<'o>],
    passthrough: Vec<&'c str>,
}

impl<'c, 'o> Converter<'c, 'o> {
    fn new(rules: &'c [CompiledRule<'o>], extra: &'c [String]) -> Self {
        let mut passthrough: Vec<&str> = DEFAULT_PASSTHROUGH.to_vec();
        for field in extra {
            if !passthrough.contains(&field.as_str()) {
                passthrough.push(field);
            }
        }
        Self { rules, passthrough }
    }

    /// Convert one field schema. `None` means the field is dropped.
    fn convert_node(&self, value: &Value, path: &mut Vec<String>) -> Option<Value> {
        let obj = value.as_object()?;

        let resolved = if declared_type(obj).is_some() && !path.is_empty() {
            let (node, nested) = self.apply_rules(value.clone(), &join_path(path));
            let Value::Object(node) = node else {
                return None;
            };
            self.resolve(&node, nested, path)
        } else {
            self.resolve(obj, is_nested(obj), path)
        };

        if resolved.is_none() {
            tracing::trace!(path = %join_path(path), "dropping field without a mappable type");
        }
        resolved.map(Resolved::into_value)
    }

    /// Fold all matching rules over `value`. Returns the result and whether
    /// any stage flagged the node as `nested`.
    fn apply_rules(&self, mut value: Value, path: &str) -> (Value, bool) {
        let mut nested = value.as_object().is_some_and(is_nested);

        for compiled in self.rules.iter().filter(|c| c.glob.is_match(path)) {
            tracing::trace!(path, pattern = compiled.glob.as_str(), "applying override");
            let rule = compiled.rule;
            let base = match &rule.transform {
                Some(transform) => transform(value, path),
                None => value,
            };
            let mut obj = match base {
                Value::Object(obj) => obj,
                _ => Map::new(),
            };
            for (key, field) in &rule.fields {
                obj.insert(key.clone(), field.clone());
            }
            nested |= is_nested(&obj);
            value = Value::Object(obj);
        }

        if nested {
            if let Some(obj) = value.as_object_mut() {
                obj.insert(NESTED_FLAG.to_string(), Value::Bool(true));
            }
        }
        (value, nested)
    }

    fn pick_passthrough(&self, node: &Map<String, Value>) -> Map<String, Value> {
        self.passthrough
            .iter()
            .filter_map(|key| node.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect()
    }

    fn resolve(
        &self,
        node: &Map<String, Value>,
        nested: bool,
        path: &mut Vec<String>,
    ) -> Option<Resolved> {
        let passthrough = self.pick_passthrough(node);

        match classify(node) {
            SchemaKind::ClosedObject(props) => {
                let children = props
                    .map(|props| self.convert_properties(props, path))
                    .unwrap_or_default();
                Some(Resolved::Container(children))
            }
            SchemaKind::OpenObject => Some(Resolved::Leaf(with_type(FLATTENED, passthrough))),
            SchemaKind::EnumeratedScalar => Some(Resolved::Leaf(with_type(KEYWORD, passthrough))),
            SchemaKind::Scalar(es_type) if es_type == TEXT => match expanded_text_type() {
                Value::Object(expanded) => {
                    Some(Resolved::Leaf(merge_leaf(expanded, passthrough)))
                }
                _ => None,
            },
            SchemaKind::Scalar(es_type) => Some(Resolved::Leaf(with_type(es_type, passthrough))),
            SchemaKind::Array(items) => {
                let item = items.and_then(|item| self.resolve(item, is_nested(item), path));
                match item {
                    Some(Resolved::Container(props)) if nested => Some(Resolved::Nested(props)),
                    Some(container @ (Resolved::Container(_) | Resolved::Nested(_))) => {
                        Some(container)
                    }
                    Some(Resolved::Leaf(leaf)) => {
                        Some(Resolved::Leaf(merge_leaf(leaf, passthrough)))
                    }
                    None if passthrough.is_empty() => None,
                    None => Some(Resolved::Leaf(passthrough)),
                }
            }
            SchemaKind::Unknown if passthrough.is_empty() => None,
            SchemaKind::Unknown => Some(Resolved::Leaf(passthrough)),
        }
    }

    fn convert_properties(
        &self,
        props: &Map<String, Value>,
        path: &mut Vec<String>,
    ) -> Map<String, Value> {
        let mut out = Map::with_capacity(props.len());
        for (name, child) in props {
            path.push(name.clone());
            if let Some(mapped) = self.convert_node(child, path) {
                out.insert(name.clone(), mapped);
            }
            path.pop();
        }
        out
    }
}

/// Merge `passthrough` over a resolved leaf. Text leaves are deep-merged so
/// extra `fields` sit next to the `keyword` sub-field; others merge shallowly.
fn merge_leaf(
    mut leaf: Map<String, Value>,
    passthrough: Map<String, Value>,
) -> Map<String, Value> {
    if leaf.get("type").and_then(Value::as_str) != Some(TEXT) {
        leaf.extend(passthrough);
        return leaf;
    }
    let mut merged = Value::Object(leaf);
    deep_merge(&mut merged, Value::Object(passthrough));
    match merged {
        Value::Object(obj) => obj,
        _ => Map::new(),
    }
}

/// `{type: es_type}` with `passthrough` shallow-merged on top.
fn with_type(es_type: &str, passthrough: Map<String, Value>) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(es_type.to_string()));
    obj.extend(passthrough);
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(schema: Value, rules: &[OverrideRule], passthrough: &[String]) -> Value {
        let compiled = compile_rules(rules).unwrap();
        convert_schema(&schema, &compiled, passthrough)
    }

    fn object(props: Value) -> Value {
        json!({ "bsonType": "object", "additionalProperties": false, "properties": props })
    }

    #[test]
    fn test_plain_string_expands_to_text_with_keyword() {
        let result = run(object(json!({ "name": { "bsonType": "string" } })), &[], &[]);
        assert_eq!(
            result,
            json!({ "properties": { "name": {
                "type": "text",
                "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
            }}})
        );
    }

    #[test]
    fn test_enumerated_string_is_keyword() {
        let schema = object(json!({ "size": { "bsonType": "string", "enum": ["a", "b"] } }));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "size": { "type": "keyword" } } })
        );
    }

    #[test]
    fn test_open_object_is_flattened() {
        let schema = object(json!({ "meta": {
            "bsonType": "object",
            "additionalProperties": true,
            "properties": { "x": { "bsonType": "string" } }
        }}));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "meta": { "type": "flattened" } } })
        );
    }

    #[test]
    fn test_array_of_scalars_is_unwrapped() {
        let schema = object(json!({
            "ids": { "bsonType": "array", "items": { "bsonType": "int" } }
        }));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "ids": { "type": "integer" } } })
        );
    }

    #[test]
    fn test_array_of_closed_objects_becomes_container() {
        let schema = object(json!({ "tags": {
            "bsonType": "array",
            "items": object(json!({ "label": { "bsonType": "bool" } }))
        }}));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "tags": {
                "properties": { "label": { "type": "boolean" } }
            }}})
        );
    }

    #[test]
    fn test_nested_flag_wraps_object_items() {
        let schema = object(json!({ "tags": {
            "bsonType": "array",
            "items": object(json!({ "label": { "bsonType": "bool" } }))
        }}));
        let rules = [OverrideRule::new("tags", Map::new()).field("nested", json!(true))];
        assert_eq!(
            run(schema, &rules, &[]),
            json!({ "properties": { "tags": {
                "type": "nested",
                "properties": { "label": { "type": "boolean" } }
            }}})
        );
    }

    #[test]
    fn test_nested_status_is_sticky() {
        let schema = object(json!({ "tags": {
            "bsonType": "array",
            "items": object(json!({ "label": { "bsonType": "bool" } }))
        }}));
        let rules = [
            OverrideRule::new("tags", Map::new()).field("nested", json!(true)),
            OverrideRule::new("tags", Map::new()).field("nested", json!(false)),
        ];
        let result = run(schema, &rules, &[]);
        assert_eq!(result["properties"]["tags"]["type"], json!("nested"));
    }

    #[test]
    fn test_nested_flag_ignored_for_scalar_items() {
        let schema = object(json!({
            "ids": { "bsonType": "array", "nested": true, "items": { "bsonType": "long" } }
        }));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "ids": { "type": "long" } } })
        );
    }

    #[test]
    fn test_array_passthrough_merged_over_item() {
        let schema = object(json!({
            "tags": { "bsonType": "array", "items": { "bsonType": "string" } }
        }));
        let rules = [OverrideRule::new("tags", Map::new()).field("copy_to", json!("all"))];
        let result = run(schema, &rules, &[]);
        assert_eq!(result["properties"]["tags"]["copy_to"], json!("all"));
        assert_eq!(result["properties"]["tags"]["type"], json!("text"));
    }

    #[test]
    fn test_array_of_strings_keeps_keyword_subfield() {
        let schema = object(json!({
            "tags": { "bsonType": "array", "items": { "bsonType": "string" } },
            "name": { "bsonType": "string" }
        }));
        let rules = [OverrideRule::new("*", Map::new())
            .field("fields", json!({ "exact": { "type": "text" } }))];
        let result = run(schema, &rules, &[]);
        let expected = json!({
            "type": "text",
            "fields": {
                "keyword": { "type": "keyword", "ignore_above": 256 },
                "exact": { "type": "text" }
            }
        });
        assert_eq!(result["properties"]["tags"], expected);
        assert_eq!(result["properties"]["name"], expected);
    }

    #[test]
    fn test_array_of_enumerated_strings_is_keyword() {
        let schema = object(json!({ "sizes": {
            "bsonType": "array",
            "items": { "bsonType": "string", "enum": ["s", "m", "l"] }
        }}));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "sizes": { "type": "keyword" } } })
        );
    }

    #[test]
    fn test_array_of_non_text_merges_shallowly() {
        let schema = object(json!({
            "ids": { "bsonType": "array", "items": { "bsonType": "int" } }
        }));
        let rules = [OverrideRule::new("ids", Map::new())
            .field("fields", json!({ "raw": { "type": "keyword" } }))];
        assert_eq!(
            run(schema, &rules, &[])["properties"]["ids"],
            json!({ "type": "integer", "fields": { "raw": { "type": "keyword" } } })
        );
    }

    #[test]
    fn test_unknown_type_is_dropped() {
        let schema = object(json!({
            "blob": { "bsonType": "binData" },
            "n": { "bsonType": "int" }
        }));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "n": { "type": "integer" } } })
        );
    }

    #[test]
    fn test_unknown_type_with_passthrough_survives() {
        let schema = object(json!({ "blob": { "bsonType": "binData", "type": "binary" } }));
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "blob": { "type": "binary" } } })
        );
    }

    #[test]
    fn test_override_ordering() {
        let schema = object(json!({ "n": { "bsonType": "int" } }));
        let rules = [
            OverrideRule::new("n", Map::new()).field("copy_to", json!("first")),
            OverrideRule::with_transform("n", |mut v, _| {
                // Sees the first rule's literal.
                let seen = v["copy_to"].clone();
                v["copy_to"] = json!([seen, "second"]);
                v
            }),
            OverrideRule::new("*", Map::new()).field("fields", json!({ "raw": {} })),
        ];
        let result = run(schema, &rules, &[]);
        assert_eq!(
            result["properties"]["n"],
            json!({ "type": "integer", "fields": { "raw": {} }, "copy_to": ["first", "second"] })
        );
    }

    #[test]
    fn test_later_literal_wins() {
        let schema = object(json!({ "n": { "bsonType": "int" } }));
        let rules = [
            OverrideRule::new("n", Map::new()).field("copy_to", json!("a")),
            OverrideRule::new("n", Map::new()).field("copy_to", json!("b")),
        ];
        assert_eq!(run(schema, &rules, &[])["properties"]["n"]["copy_to"], json!("b"));
    }

    #[test]
    fn test_transform_receives_normalized_path() {
        let schema = object(json!({ "a": {
            "bsonType": "array",
            "items": object(json!({ "b": { "bsonType": "int" } }))
        }}));
        let rules = [OverrideRule::with_transform("a.b", |mut v, path| {
            v["copy_to"] = json!(path);
            v
        })];
        let result = run(schema, &rules, &[]);
        assert_eq!(result["properties"]["a"]["properties"]["b"]["copy_to"], json!("a.b"));
    }

    #[test]
    fn test_text_passthrough_is_deep_merged() {
        let schema = object(json!({ "name": { "bsonType": "string" } }));
        let rules = [OverrideRule::new("name", Map::new())
            .field("fields", json!({ "exact": { "type": "text", "analyzer": "exact" } }))];
        let result = run(schema, &rules, &[]);
        assert_eq!(
            result["properties"]["name"]["fields"],
            json!({
                "keyword": { "type": "keyword", "ignore_above": 256 },
                "exact": { "type": "text", "analyzer": "exact" }
            })
        );
    }

    #[test]
    fn test_caller_passthrough_fields() {
        let schema = object(json!({ "name": { "bsonType": "bool", "index": false, "other": 1 } }));
        let result = run(schema, &[], &["index".to_string()]);
        assert_eq!(
            result["properties"]["name"],
            json!({ "type": "boolean", "index": false })
        );
    }

    #[test]
    fn test_closed_object_drops_passthrough() {
        let schema = object(json!({ "addr": object(json!({ "zip": { "bsonType": "int" } })) }));
        let rules = [OverrideRule::new("*", Map::new()).field("copy_to", json!("all"))];
        let result = run(schema, &rules, &[]);
        assert_eq!(
            result["properties"]["addr"],
            json!({ "properties": { "zip": { "type": "integer" } } })
        );
    }

    #[test]
    fn test_untyped_root_with_properties() {
        let schema = json!({ "properties": { "n": { "bsonType": "int" } } });
        assert_eq!(
            run(schema, &[], &[]),
            json!({ "properties": { "n": { "type": "integer" } } })
        );
    }

    #[test]
    fn test_invalid_glob_is_fatal() {
        let rules = [OverrideRule::new("a.[b", Map::new())];
        assert!(matches!(
            compile_rules(&rules),
            Err(ConvertError::InvalidPattern { .. })
        ));
    }
}
