//! Ready-made override rules for common mapping tweaks.

use serde_json::{Map, Value};

use crate::config::OverrideRule;
use crate::schema_utils::BSON_TYPE;

/// Force the Elasticsearch type of every field matching `path`.
///
/// The declared `bsonType` is removed, so the mapping is exactly
/// `{type: es_type}` (plus any other passthrough fields).
///
/// ```
/// use mongo2elastic_core::{convert, overrides::set_es_type, ConvertOptions};
/// use serde_json::json;
///
/// let schema = json!({
///     "bsonType": "object",
///     "additionalProperties": false,
///     "properties": { "latlong": { "bsonType": "string" } }
/// });
/// let options = ConvertOptions {
///     overrides: vec![set_es_type("latlong", "geo_point")],
///     ..Default::default()
/// };
/// let mapping = convert(&schema, &options).unwrap();
/// assert_eq!(mapping["properties"]["latlong"], json!({ "type": "geo_point" }));
/// ```
pub fn set_es_type(path: impl Into<String>, es_type: &str) -> OverrideRule {
    OverrideRule::with_transform(path, |mut node, _| {
        if let Some(obj) = node.as_object_mut() {
            obj.shift_remove(BSON_TYPE);
        }
        node
    })
    .field("type", Value::String(es_type.to_string()))
}

/// Append `targets` to the `copy_to` list of every field matching `path`.
///
/// An existing scalar `copy_to` is kept as the first list entry, so several
/// `copy_to` rules matching the same field accumulate.
pub fn copy_to<I, S>(path: impl Into<String>, targets: I) -> OverrideRule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    copy_to_if(path, targets, |_| true)
}

/// Like [`copy_to`], but only for nodes where `predicate` holds
/// (see [`crate::is_stringlike`]).
pub fn copy_to_if<I, S, P>(path: impl Into<String>, targets: I, predicate: P) -> OverrideRule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    P: Fn(&Value) -> bool + Send + Sync + 'static,
{
    let targets: Vec<Value> = targets
        .into_iter()
        .map(|t| Value::String(t.into()))
        .collect();

    OverrideRule::with_transform(path, move |mut node, _| {
        if !predicate(&node) {
            return node;
        }
        if let Some(obj) = node.as_object_mut() {
            let mut list = match obj.shift_remove("copy_to") {
                Some(Value::Array(existing)) => existing,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other],
            };
            list.extend(targets.iter().cloned());
            obj.insert("copy_to".to_string(), Value::Array(list));
        }
        node
    })
}

/// Literal-only rule from a JSON object, e.g. `{"copy_to": "all"}`.
///
/// Non-object values produce a rule without fields.
pub fn literal(path: impl Into<String>, fields: Value) -> OverrideRule {
    let fields = match fields {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    OverrideRule::new(path, fields)
}
