//! Generic tree traversal over `serde_json::Value`.
//!
//! Two drivers:
//! - [`map`]: rebuilds the tree bottom-up, handing every node (children already
//!   rebuilt) to a callback that may replace or delete it.
//! - [`walk`]: read-only pre-order visit, with a caller-supplied child selector
//!   so schema-aware callers decide which keys hold sub-trees.
//!
//! Neither driver knows anything about schema keywords.

use serde_json::{Map, Value};

use crate::path_utils::{join_path, normalize_path};

/// A node handed to the [`map`] callback.
#[derive(Debug)]
pub struct Node<'n> {
    /// Key under which the node lives in its parent (array index for array
    /// elements). `None` for the root.
    pub key: Option<&'n str>,
    /// The node with its children already mapped.
    pub value: Value,
    /// Original (unmapped) ancestors, root first.
    pub ancestors: &'n [&'n Value],
    /// Raw path from the root.
    pub path: &'n [String],
}

impl Node<'_> {
    /// Path with `properties`/`items` markers stripped.
    pub fn normalized_path(&self) -> Vec<String> {
        normalize_path(self.path)
    }

    /// Dotted form of [`Node::normalized_path`].
    pub fn normalized_path_string(&self) -> String {
        join_path(&self.normalized_path())
    }
}

/// A node handed to the [`walk`] callback.
#[derive(Debug)]
pub struct Visit<'n> {
    pub key: Option<&'n str>,
    pub value: &'n Value,
    pub ancestors: &'n [&'n Value],
    pub path: &'n [String],
}

impl Visit<'_> {
    pub fn normalized_path(&self) -> Vec<String> {
        normalize_path(self.path)
    }
}

// ---------------------------------------------------------------------------
// map
// ---------------------------------------------------------------------------

/// Map every node of `tree` depth-first, children before parents.
///
/// Object members and array elements are all visited. Returning `None` from
/// `f` deletes the node: an object parent drops the key, an array parent drops
/// the element. Returns `None` when the root itself is deleted.
pub fn map<F>(tree: &Value, f: &mut F) -> Option<Value>
where
    F: FnMut(Node<'_>) -> Option<Value>,
{
    let mut ancestors = Vec::new();
    let mut path = Vec::new();
    map_node(tree, &mut ancestors, &mut path, f)
}

fn map_node<'t, F>(
    value: &'t Value,
    ancestors: &mut Vec<&'t Value>,
    path: &mut Vec<String>,
    f: &mut F,
) -> Option<Value>
where
    F: FnMut(Node<'_>) -> Option<Value>,
{
    let rebuilt = match value {
        Value::Object(obj) => {
            ancestors.push(value);
            let mut out = Map::with_capacity(obj.len());
            for (key, child) in obj {
                path.push(key.clone());
                if let Some(mapped) = map_node(child, ancestors, path, f) {
                    out.insert(key.clone(), mapped);
                }
                path.pop();
            }
            ancestors.pop();
            Value::Object(out)
        }
        Value::Array(arr) => {
            ancestors.push(value);
            let mut out = Vec::with_capacity(arr.len());
            for (i, child) in arr.iter().enumerate() {
                path.push(i.to_string());
                if let Some(mapped) = map_node(child, ancestors, path, f) {
                    out.push(mapped);
                }
                path.pop();
            }
            ancestors.pop();
            Value::Array(out)
        }
        other => other.clone(),
    };

    f(Node {
        key: path.last().map(String::as_str),
        value: rebuilt,
        ancestors: ancestors.as_slice(),
        path: path.as_slice(),
    })
}

// ---------------------------------------------------------------------------
// walk
// ---------------------------------------------------------------------------

/// Child edge returned by a [`walk`] selector: the raw path segments leading
/// to the child, and the child itself.
pub type Edge<'t> = (Vec<&'t str>, &'t Value);

/// Visit every node reachable through `children`, parents before children.
///
/// The first error returned by `f` stops the walk and is propagated.
pub fn walk<'t, C, F, E>(tree: &'t Value, children: &C, f: &mut F) -> Result<(), E>
where
    C: Fn(&'t Value) -> Vec<Edge<'t>>,
    F: FnMut(Visit<'_>) -> Result<(), E>,
{
    let mut ancestors = Vec::new();
    let mut path = Vec::new();
    walk_node(tree, children, &mut ancestors, &mut path, f)
}

fn walk_node<'t, C, F, E>(
    value: &'t Value,
    children: &C,
    ancestors: &mut Vec<&'t Value>,
    path: &mut Vec<String>,
    f: &mut F,
) -> Result<(), E>
where
    C: Fn(&'t Value) -> Vec<Edge<'t>>,
    F: FnMut(Visit<'_>) -> Result<(), E>,
{
    f(Visit {
        key: path.last().map(String::as_str),
        value,
        ancestors: ancestors.as_slice(),
        path: path.as_slice(),
    })?;

    ancestors.push(value);
    for (segments, child) in children(value) {
        let depth = path.len();
        path.extend(segments.iter().map(|s| s.to_string()));
        walk_node(child, children, ancestors, path, f)?;
        path.truncate(depth);
    }
    ancestors.pop();
    Ok(())
}

/// Child selector for schema trees: every entry of `properties` plus `items`.
pub fn schema_children(value: &Value) -> Vec<Edge<'_>> {
    let mut edges = Vec::new();
    if let Some(props) = value.get("properties").and_then(Value::as_object) {
        for (name, child) in props {
            edges.push((vec!["properties", name.as_str()], child));
        }
    }
    if let Some(items) = value.get("items").filter(|v| v.is_object()) {
        edges.push((vec!["items"], items));
    }
    edges
}
