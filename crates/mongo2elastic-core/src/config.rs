//! Configuration for schema conversion.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::walker::Node;

/// Whole-node preprocessing hook, run over every node of the input schema
/// before any other pass. Returning `None` deletes the node.
pub type SchemaMapper = Arc<dyn Fn(Node<'_>) -> Option<Value> + Send + Sync>;

/// Per-rule transform: receives the (possibly already overridden) schema node
/// and its dotted normalized path, returns the replacement node.
pub type NodeTransform = Arc<dyn Fn(Value, &str) -> Value + Send + Sync>;

/// Options for schema conversion.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case`. Closure-valued members
/// (`map_schema` and rule transforms) cannot be expressed in JSON and are
/// skipped; they are only settable from Rust.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConvertOptions {
    /// Preprocessing hook applied to every node before all other passes.
    #[serde(skip)]
    pub map_schema: Option<SchemaMapper>,
    /// Normalized paths whose subtrees are dropped.
    pub omit: Vec<String>,
    /// Normalized old path → normalized new path. Only the leaf may change.
    pub rename: BTreeMap<String, String>,
    /// Ordered override rules; every matching rule applies, in order.
    pub overrides: Vec<OverrideRule>,
    /// Extra side fields copied verbatim into the mapping.
    pub passthrough: Vec<String>,
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("map_schema", &self.map_schema.as_ref().map(|_| "<fn>"))
            .field("omit", &self.omit)
            .field("rename", &self.rename)
            .field("overrides", &self.overrides)
            .field("passthrough", &self.passthrough)
            .finish()
    }
}

/// A path-matched override.
///
/// In JSON form every key besides `path` is a literal field:
/// `{"path": "addresses.*", "copy_to": "all"}`.
#[derive(Clone, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Glob over the dotted normalized path.
    pub path: String,
    /// Optional transform applied before the literal fields are merged.
    #[serde(skip)]
    pub transform: Option<NodeTransform>,
    /// Fields shallow-merged over the (transformed) node.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl OverrideRule {
    /// A rule that only merges literal fields.
    pub fn new(path: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            transform: None,
            fields,
        }
    }

    /// A rule that runs `transform` on every matching node.
    pub fn with_transform<F>(path: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value, &str) -> Value + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            transform: Some(Arc::new(transform)),
            fields: Map::new(),
        }
    }

    /// Add a literal field.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideRule")
            .field("path", &self.path)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("fields", &self.fields)
            .finish()
    }
}
