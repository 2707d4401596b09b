//! Dotted-path helpers shared by every pass.
//!
//! Two path flavours exist:
//! 1. **Raw paths**: every key from the schema root, including the structural
//!    keywords (`["properties", "addresses", "items", "properties", "name"]`).
//! 2. **Normalized paths**: the user-facing field chain with those keywords
//!    stripped (`["addresses", "name"]`), written `addresses.name`.
//!
//! `omit`, `rename` and override patterns are all expressed as normalized paths.
//! Raw paths are turned into RFC 6901 JSON Pointers when a pass needs to edit
//! the tree in place.

use std::borrow::Cow;

/// Keyword holding a map of child field schemas.
pub const PROPERTIES: &str = "properties";
/// Keyword holding the single element schema of an array.
pub const ITEMS: &str = "items";

/// Split a dotted path into its segments.
///
/// # Example
/// ```
/// use mongo2elastic_core::split_path;
/// assert_eq!(split_path("addresses.address.zip"), vec!["addresses", "address", "zip"]);
/// assert_eq!(split_path(""), Vec::<String>::new());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(str::to_string).collect()
}

/// Join segments into a dotted path.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            path.push('.');
        }
        path.push_str(segment.as_ref());
    }
    path
}

/// Strip structural keywords from a raw schema path.
///
/// A `properties` segment is a marker only when followed by a field name; the
/// name itself is kept even if it happens to be `properties` or `items`.
/// Every `items` segment in marker position is dropped, so an array and its
/// element schema share one normalized path.
///
/// # Example
/// ```
/// use mongo2elastic_core::normalize_path;
/// let raw = ["properties", "addresses", "items", "properties", "zip"];
/// assert_eq!(normalize_path(&raw), vec!["addresses", "zip"]);
/// ```
pub fn normalize_path<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut normalized = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_ref() {
            PROPERTIES if i + 1 < raw.len() => {
                normalized.push(raw[i + 1].as_ref().to_string());
                i += 2;
            }
            ITEMS => i += 1,
            other => {
                normalized.push(other.to_string());
                i += 1;
            }
        }
    }
    normalized
}

/// All segments but the last. Empty for root-level and empty paths.
pub fn parent_segments<S>(path: &[S]) -> &[S] {
    match path.split_last() {
        Some((_, parent)) => parent,
        None => path,
    }
}

/// Escape a single JSON Pointer segment per RFC 6901.
///
/// - `~` → `~0`
/// - `/` → `~1`
pub fn escape_pointer_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Build a JSON Pointer (`/a/b`) from raw path segments.
///
/// # Example
/// ```
/// use mongo2elastic_core::build_pointer;
/// assert_eq!(build_pointer(&["properties", "a/b"]), "/properties/a~1b");
/// assert_eq!(build_pointer::<&str>(&[]), "");
/// ```
pub fn build_pointer<S: AsRef<str>>(segments: &[S]) -> String {
    let mut pointer = String::new();
    for segment in segments {
        pointer.push('/');
        pointer.push_str(&escape_pointer_segment(segment.as_ref()));
    }
    pointer
}
