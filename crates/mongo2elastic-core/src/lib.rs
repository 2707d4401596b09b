//! # mongo2elastic-core
//!
//! Convert MongoDB `$jsonSchema` definitions into Elasticsearch index mappings.
//!
//! The conversion runs four passes over the schema tree:
//!
//! | Pass | Module                          | Purpose                                   |
//! |------|---------------------------------|-------------------------------------------|
//! | 0    | [`passes::p0_preprocess`]       | Caller's whole-node `map_schema` hook     |
//! | 1    | [`passes::p1_omit`]             | Drop omitted fields, collapse type lists  |
//! | 2    | [`passes::p2_rename`]           | Rename fields (leaf only, `_id` default)  |
//! | 3    | [`passes::p3_convert`]          | Apply overrides and emit the mapping      |
//!
//! The [`sync`] module builds on the mapping to keep an index in step with a
//! collection: index naming, settings, change-event translation and bulk
//! response summaries.
//!
//! ```
//! use mongo2elastic_core::{convert, ConvertOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "bsonType": "object",
//!     "additionalProperties": false,
//!     "properties": {
//!         "_id": { "bsonType": "objectId" },
//!         "active": { "bsonType": "bool" }
//!     }
//! });
//!
//! let mapping = convert(&schema, &ConvertOptions::default()).unwrap();
//! assert_eq!(
//!     mapping,
//!     json!({ "properties": {
//!         "_mongoId": { "type": "keyword" },
//!         "active": { "type": "boolean" }
//!     }})
//! );
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod glob;
pub mod overrides;
pub mod passes;
pub mod path_utils;
pub mod schema_utils;
pub mod sync;
pub mod type_table;
pub mod walker;

pub use config::{ConvertOptions, NodeTransform, OverrideRule, SchemaMapper};
pub use document::DocumentMapper;
pub use error::{ConvertError, ErrorCode};
pub use glob::GlobPattern;
pub use passes::p2_rename::MONGO_ID_FIELD;
pub use path_utils::{build_pointer, normalize_path, split_path};
pub use schema_utils::is_stringlike;
pub use sync::{ChangeEvent, IndexAdmin, ProcessSummary, SchemaSource, SyncError, Syncer};
pub use walker::Node;

use serde_json::Value;

use passes::{p0_preprocess, p1_omit, p2_rename, p3_convert};

/// Convert a MongoDB `$jsonSchema` into an Elasticsearch mapping.
///
/// The input is never mutated. Override globs and rename prefixes are
/// validated before any pass runs, so a bad option fails fast with no
/// partial output.
///
/// # Errors
///
/// - [`ConvertError::InvalidPattern`] for an override glob that cannot be compiled.
/// - [`ConvertError::RenamePrefixMismatch`] when a rename changes more than the leaf.
/// - [`ConvertError::RenameCollision`] when a rename would overwrite a sibling.
pub fn convert(schema: &Value, options: &ConvertOptions) -> Result<Value, ConvertError> {
    let rules = p3_convert::compile_rules(&options.overrides)?;

    let mut rename = p2_rename::default_renames();
    rename.extend(
        options
            .rename
            .iter()
            .map(|(old, new)| (old.clone(), new.clone())),
    );
    p2_rename::validate_prefixes(&rename)?;

    tracing::debug!(
        omit = options.omit.len(),
        rename = rename.len(),
        overrides = rules.len(),
        passthrough = options.passthrough.len(),
        "converting schema"
    );

    let schema = p0_preprocess::preprocess(schema, options.map_schema.as_ref());
    let schema = p1_omit::omit_and_normalize(&schema, &options.omit);
    let schema = p2_rename::rename_fields(schema, &rename)?;
    let mapping = p3_convert::convert_schema(&schema, &rules, &options.passthrough);

    let fields = mapping
        .get(path_utils::PROPERTIES)
        .and_then(Value::as_object)
        .map_or(0, |props| props.len());
    tracing::debug!(fields, "schema converted");
    Ok(mapping)
}

/// Parse a schema and options from JSON strings and convert.
///
/// Convenience for bindings and the CLI, where both inputs arrive as text.
pub fn convert_json(schema: &str, options: Option<&str>) -> Result<Value, ConvertError> {
    let schema: Value = serde_json::from_str(schema)?;
    let options: ConvertOptions = match options {
        Some(text) => serde_json::from_str(text)?,
        None => ConvertOptions::default(),
    };
    convert(&schema, &options)
}
