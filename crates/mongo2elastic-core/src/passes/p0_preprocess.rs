//! Pass 0: Preprocessing
//!
//! Runs the caller's `map_schema` hook over every node of the input schema,
//! children before parents. This is the escape hatch for structural edits the
//! declarative options cannot express. Without a hook the schema is copied
//! unchanged, so later passes never touch the caller's value.

use serde_json::{Map, Value};

use crate::config::SchemaMapper;
use crate::walker::map;

/// Apply the preprocessing hook, if any.
///
/// Deleting the root yields an empty schema.
pub fn preprocess(schema: &Value, mapper: Option<&SchemaMapper>) -> Value {
    let Some(mapper) = mapper else {
        return schema.clone();
    };

    map(schema, &mut |node| mapper(node)).unwrap_or_else(|| {
        tracing::debug!("map_schema removed the schema root");
        Value::Object(Map::new())
    })
}
