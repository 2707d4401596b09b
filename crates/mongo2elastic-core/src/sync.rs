//! Collection → index synchronization glue.
//!
//! Everything here is transport-agnostic: the cluster is reached through the
//! [`IndexAdmin`] trait and the schema through [`SchemaSource`], so the
//! translation of change events into bulk requests and of bulk responses into
//! summaries stays pure and testable. Per-item bulk failures are counted in
//! the [`ProcessSummary`]; only transport failures surface as [`SyncError`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::ConvertOptions;
pub use crate::document::id_to_string;
use crate::document::{DocumentMapper, ID_FIELD};
use crate::error::ConvertError;
use crate::schema_utils::deep_merge;

/// Bulk actions that may carry a per-item `error`.
const BULK_ACTIONS: &[&str] = &["create", "delete", "index", "update"];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("{operation} event has no document id")]
    MissingDocumentId { operation: OperationType },

    #[error("Elasticsearch request {request} failed: {message}")]
    Backend {
        request: &'static str,
        message: String,
    },
}

/// Index name for a collection: the lowercased collection name.
pub fn index_from_collection(collection: &str) -> String {
    collection.to_lowercase()
}

/// Index name scoped by database: `<db>_<collection>`, lowercased.
pub fn index_from_db_and_collection(db: &str, collection: &str) -> String {
    format!("{}_{}", db.to_lowercase(), collection.to_lowercase())
}

/// Index settings with `index.mapping.ignore_malformed: true`, deep-merged
/// under the caller's settings (caller values win).
pub fn index_settings(custom: Value) -> Value {
    let mut settings = json!({ "index": { "mapping": { "ignore_malformed": true } } });
    if custom.is_object() {
        deep_merge(&mut settings, custom);
    }
    settings
}

/// Extract the `$jsonSchema` validator from a collection's options document
/// (the `options` field of a `listCollections` entry).
pub fn schema_from_collection_options(options: &Value) -> Option<Value> {
    options.pointer("/validator/$jsonSchema").cloned()
}

/// Change stream operation kinds that reach the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Insert,
    Update,
    Replace,
    Delete,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        })
    }
}

/// One change stream event, in MongoDB's wire shape:
/// `{"operationType": "...", "documentKey": {"_id": ...}, "fullDocument": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub operation_type: OperationType,
    #[serde(default)]
    pub document_key: Option<Value>,
    #[serde(default)]
    pub full_document: Option<Value>,
}

impl ChangeEvent {
    /// Document id used as the Elasticsearch `_id`.
    ///
    /// Inserts read it from the full document, every other operation from the
    /// document key.
    pub fn document_id(&self) -> Option<String> {
        let source = match self.operation_type {
            OperationType::Insert => self.full_document.as_ref(),
            _ => self.document_key.as_ref(),
        };
        source.and_then(|doc| doc.get(ID_FIELD)).and_then(id_to_string)
    }
}

/// Number of events per operation type in one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    pub insert: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl OperationCounts {
    pub fn record(&mut self, operation: OperationType) {
        match operation {
            OperationType::Insert => self.insert += 1,
            OperationType::Update => self.update += 1,
            OperationType::Replace => self.replace += 1,
            OperationType::Delete => self.delete += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.insert + self.update + self.replace + self.delete
    }
}

/// Translate change events into flat bulk request lines.
///
/// - insert → `create` + mapped document
/// - update / replace → `index` + mapped document (`{}` without a full document)
/// - delete → `delete`
pub fn bulk_operations(
    index: &str,
    events: &[ChangeEvent],
    mapper: &DocumentMapper,
) -> Result<(Vec<Value>, OperationCounts), SyncError> {
    let mut operations = Vec::with_capacity(events.len() * 2);
    let mut counts = OperationCounts::default();

    for event in events {
        counts.record(event.operation_type);
        let id = event
            .document_id()
            .ok_or(SyncError::MissingDocumentId {
                operation: event.operation_type,
            })?;

        match event.operation_type {
            OperationType::Insert => {
                operations.push(json!({ "create": { "_index": index, "_id": id } }));
                operations.push(mapped_document(event, mapper));
            }
            OperationType::Update | OperationType::Replace => {
                operations.push(json!({ "index": { "_index": index, "_id": id } }));
                operations.push(mapped_document(event, mapper));
            }
            OperationType::Delete => {
                operations.push(json!({ "delete": { "_index": index, "_id": id } }));
            }
        }
    }
    Ok((operations, counts))
}

fn mapped_document(event: &ChangeEvent, mapper: &DocumentMapper) -> Value {
    match &event.full_document {
        Some(doc) => mapper.map(doc.clone()),
        None => Value::Object(Map::new()),
    }
}

/// The parts of an Elasticsearch bulk response the sync layer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl BulkResponse {
    /// Items whose action result carries an `error`.
    pub fn failed_items(&self) -> Vec<Value> {
        self.items
            .iter()
            .filter(|item| {
                BULK_ACTIONS
                    .iter()
                    .any(|action| item.get(*action).and_then(|r| r.get("error")).is_some())
            })
            .cloned()
            .collect()
    }
}

/// Where a processed batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchSource {
    ChangeStream,
    InitialScan,
}

/// Outcome of one bulk batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub source: BatchSource,
    pub success: usize,
    pub fail: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<OperationCounts>,
}

impl ProcessSummary {
    /// Summarize a bulk response for a batch of `total` source records.
    pub fn from_response(
        source: BatchSource,
        total: usize,
        response: &BulkResponse,
        counts: Option<OperationCounts>,
    ) -> Self {
        let errors = if response.errors {
            response.failed_items()
        } else {
            Vec::new()
        };
        let fail = errors.len();
        Self {
            source,
            success: total.saturating_sub(fail),
            fail,
            errors,
            counts,
        }
    }
}

/// Cluster operations the sync layer needs.
pub trait IndexAdmin {
    fn create_index(&mut self, index: &str, settings: &Value) -> Result<(), SyncError>;
    fn put_mapping(&mut self, index: &str, mapping: &Value) -> Result<(), SyncError>;
    fn bulk(&mut self, operations: &[Value]) -> Result<BulkResponse, SyncError>;
}

/// Supplies the collection's `$jsonSchema`, if it has one.
pub trait SchemaSource {
    fn collection_schema(&mut self) -> Result<Option<Value>, SyncError>;
}

/// Keeps one index in step with one collection.
pub struct Syncer<A> {
    admin: A,
    index: String,
    mapper: DocumentMapper,
}

impl<A: IndexAdmin> Syncer<A> {
    /// `rename` is applied to documents; pass the same map in the
    /// [`ConvertOptions`] used for the mapping.
    pub fn new(
        admin: A,
        index: impl Into<String>,
        rename: &BTreeMap<String, String>,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            admin,
            index: index.into(),
            mapper: DocumentMapper::new(rename)?,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn admin(&self) -> &A {
        &self.admin
    }

    pub fn into_admin(self) -> A {
        self.admin
    }

    /// Create the index with `ignore_malformed` enabled.
    pub fn create_index_ignore_malformed(&mut self, settings: Value) -> Result<(), SyncError> {
        let settings = index_settings(settings);
        tracing::debug!(index = %self.index, "creating index");
        self.admin.create_index(&self.index, &settings)
    }

    /// Convert `schema` and put the resulting mapping. Returns the mapping.
    pub fn create_mapping_from_schema(
        &mut self,
        schema: &Value,
        options: &ConvertOptions,
    ) -> Result<Value, SyncError> {
        let mapping = crate::convert(schema, options)?;
        tracing::debug!(index = %self.index, "putting mapping");
        self.admin.put_mapping(&self.index, &mapping)?;
        Ok(mapping)
    }

    /// Fetch the schema from `source` and put its mapping. Returns `false`
    /// when the collection has no schema.
    pub fn sync_mapping<S: SchemaSource>(
        &mut self,
        source: &mut S,
        options: &ConvertOptions,
    ) -> Result<bool, SyncError> {
        match source.collection_schema()? {
            Some(schema) => {
                self.create_mapping_from_schema(&schema, options)?;
                Ok(true)
            }
            None => {
                tracing::warn!(index = %self.index, "collection has no $jsonSchema; mapping not created");
                Ok(false)
            }
        }
    }

    /// Send one batch of change stream events.
    pub fn process_change_events(
        &mut self,
        events: &[ChangeEvent],
    ) -> Result<ProcessSummary, SyncError> {
        if events.is_empty() {
            return Ok(ProcessSummary::from_response(
                BatchSource::ChangeStream,
                0,
                &BulkResponse::default(),
                Some(OperationCounts::default()),
            ));
        }
        let (operations, counts) = bulk_operations(&self.index, events, &self.mapper)?;
        let response = self.admin.bulk(&operations)?;
        let summary = ProcessSummary::from_response(
            BatchSource::ChangeStream,
            events.len(),
            &response,
            Some(counts),
        );
        log_summary(&self.index, &summary);
        Ok(summary)
    }

    /// Send one batch of initial-scan documents as `create` actions.
    pub fn process_records(&mut self, documents: &[Value]) -> Result<ProcessSummary, SyncError> {
        if documents.is_empty() {
            return Ok(ProcessSummary::from_response(
                BatchSource::InitialScan,
                0,
                &BulkResponse::default(),
                None,
            ));
        }
        let mut operations = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            let id = doc
                .get(ID_FIELD)
                .and_then(id_to_string)
                .ok_or(SyncError::MissingDocumentId {
                    operation: OperationType::Insert,
                })?;
            operations.push(json!({ "create": { "_index": self.index, "_id": id } }));
            operations.push(self.mapper.map(doc.clone()));
        }
        let response = self.admin.bulk(&operations)?;
        let summary =
            ProcessSummary::from_response(BatchSource::InitialScan, documents.len(), &response, None);
        log_summary(&self.index, &summary);
        Ok(summary)
    }
}

fn log_summary(index: &str, summary: &ProcessSummary) {
    if summary.fail > 0 {
        tracing::warn!(index, success = summary.success, fail = summary.fail, "bulk batch had failures");
    } else {
        tracing::debug!(index, success = summary.success, "bulk batch processed");
    }
}
