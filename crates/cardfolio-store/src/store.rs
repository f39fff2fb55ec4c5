//! The trait all document store backends implement

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::query::Query;

/// Store-assigned document identifier.
pub type DocumentId = String;

/// A stored document: its id plus the JSON body.
///
/// The id lives outside the body, matching document-database convention;
/// `to_record` folds it back in for types that carry an `id` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub body: Value,
}

impl Document {
    /// Deserialize the body into `T` with the document id injected under
    /// the `"id"` key.
    pub fn to_record<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut body = self.body.clone();
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        serde_json::from_value(body).map_err(StoreError::Deserialize)
    }
}

/// Errors from a document store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: DocumentId },

    #[error("document body must be a JSON object")]
    NotAnObject,

    #[error("field {field:?} is not numeric, cannot increment")]
    NotANumber { field: String },

    #[error("deserialize: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("storage: {0}")]
    Storage(String),
}

/// The contract every durable backend provides: keyed JSON documents in
/// named collections, equality/order/limit queries, and an atomic numeric
/// increment.
///
/// There are no cross-document transactions. Multi-write operations built
/// on top of this trait (card moves, category deletions) are sequenced by
/// the caller and can be left partially applied by a mid-sequence failure.
/// `increment` is the exception: implementations must apply it without a
/// read-modify-write race, since it is the funnel for the category card
/// counters.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return it with its assigned id.
    /// The body must be a JSON object.
    fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError>;

    /// Fetch one document, or `None` if it does not exist.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Shallow-merge `patch` (a JSON object) into an existing document.
    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is a `NotFound` error,
    /// not a silent success.
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Fetch all documents in a collection matching the query.
    fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Atomically add `delta` to a numeric field, creating it at zero when
    /// absent. Returns the new value. Negative deltas are permitted; the
    /// store does not clamp.
    fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError>;
}
