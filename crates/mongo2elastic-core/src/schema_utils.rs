//! Shared helpers for reading `$jsonSchema` nodes and merging JSON objects.

use serde_json::{Map, Value};

use crate::type_table::elastic_type;

/// Keyword holding the declared BSON type (string or array of strings).
pub const BSON_TYPE: &str = "bsonType";
/// Side field marking an array of objects as `nested`.
pub const NESTED_FLAG: &str = "nested";

/// The node's declared type, when it is a string or an array of strings.
///
/// For an array the first entry is returned; the omission pass collapses such
/// arrays so later passes only ever see a single name.
pub fn declared_type(node: &Map<String, Value>) -> Option<&str> {
    match node.get(BSON_TYPE)? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types.first().and_then(Value::as_str),
        _ => None,
    }
}

/// Does the value carry a declared type?
pub fn has_declared_type(value: &Value) -> bool {
    value.as_object().and_then(declared_type).is_some()
}

/// `additionalProperties: false` is the only closed shape; absent or `true`
/// (or a sub-schema) means the object is open.
pub fn is_closed(node: &Map<String, Value>) -> bool {
    node.get("additionalProperties") == Some(&Value::Bool(false))
}

/// Is the node flagged for `nested` treatment?
pub fn is_nested(node: &Map<String, Value>) -> bool {
    node.get(NESTED_FLAG) == Some(&Value::Bool(true))
}

/// Closed classification of a schema node.
#[derive(Debug, PartialEq)]
pub enum SchemaKind<'a> {
    /// Scalar with a table entry; carries the Elasticsearch type.
    Scalar(&'static str),
    /// `string` restricted by `enum`.
    EnumeratedScalar,
    /// `object` without `additionalProperties: false`.
    OpenObject,
    /// `object` with `additionalProperties: false`; carries `properties`.
    ClosedObject(Option<&'a Map<String, Value>>),
    /// `array`; carries the `items` schema when it is an object.
    Array(Option<&'a Map<String, Value>>),
    /// No declared type, or one the table does not know.
    Unknown,
}

/// Classify a schema node by its declared type.
pub fn classify(node: &Map<String, Value>) -> SchemaKind<'_> {
    let Some(bson_type) = declared_type(node) else {
        return SchemaKind::Unknown;
    };
    match bson_type {
        "object" if is_closed(node) => {
            SchemaKind::ClosedObject(node.get("properties").and_then(Value::as_object))
        }
        "object" => SchemaKind::OpenObject,
        "array" => SchemaKind::Array(node.get("items").and_then(Value::as_object)),
        "string" if node.get("enum").is_some_and(Value::is_array) => SchemaKind::EnumeratedScalar,
        other => match elastic_type(other) {
            Some(es) => SchemaKind::Scalar(es),
            None => SchemaKind::Unknown,
        },
    }
}

/// Is the node a string, or an array of strings?
pub fn is_stringlike(node: &Value) -> bool {
    let Some(obj) = node.as_object() else {
        return false;
    };
    match declared_type(obj) {
        Some("string") => true,
        Some("array") => obj
            .get("items")
            .and_then(Value::as_object)
            .and_then(declared_type)
            == Some("string"),
        _ => false,
    }
}

/// Recursively merge `source` into `target`.
///
/// Objects merge key by key; any other source value replaces the target value.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}
