//! Static BSON → Elasticsearch primitive type table.

use serde_json::{json, Value};

/// Elasticsearch type used for open objects.
pub const FLATTENED: &str = "flattened";
/// Elasticsearch type used for grouped arrays of objects.
pub const NESTED: &str = "nested";
/// Exact-match string type.
pub const KEYWORD: &str = "keyword";
/// Full-text string type.
pub const TEXT: &str = "text";
/// `ignore_above` applied to the keyword sub-field of expanded text.
pub const KEYWORD_IGNORE_ABOVE: u64 = 256;

/// Look up the Elasticsearch type for a scalar `bsonType`.
///
/// Container types (`object`, `array`) are not in the table.
pub fn elastic_type(bson_type: &str) -> Option<&'static str> {
    let es = match bson_type {
        "number" => "long",
        "double" => "double",
        "int" => "integer",
        "long" => "long",
        "decimal" => "double",
        "objectId" => KEYWORD,
        "string" => TEXT,
        "date" => "date",
        "timestamp" => "date",
        "bool" => "boolean",
        _ => return None,
    };
    Some(es)
}

/// `text` with an exact-match `keyword` sub-field.
pub fn expanded_text_type() -> Value {
    json!({
        "type": TEXT,
        "fields": {
            "keyword": {
                "type": KEYWORD,
                "ignore_above": KEYWORD_IGNORE_ABOVE
            }
        }
    })
}
