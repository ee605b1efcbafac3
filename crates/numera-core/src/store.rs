//! Document store abstraction for the registry's persistent state.
//!
//! The store holds named collections of JSON documents and exposes three
//! guarantees the rest of the system is built on:
//!
//! - **Atomic batches**: a [`WriteBatch`] applies all of its operations or
//!   none of them. Multi-record moves (sell, pre-book, transition back to
//!   inventory) ride on this.
//! - **History union**: merge operations union lifecycle events into a
//!   document's `history` array keyed by event ID, so concurrent appends
//!   never overwrite each other.
//! - **Change notices**: subscribers learn which collection changed and
//!   re-read it, which feeds the registry's in-memory snapshots.
//!
//! [`MemoryStore`] is the bundled backend. It is thread-safe via `RwLock`
//! and suitable for single-process deployments and tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::error::{Error, Result};

/// A stored document: its collection-unique ID plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document ID, unique within its collection.
    pub id: String,
    /// The document body. Always a JSON object.
    pub data: Value,
}

/// A single operation inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Creates or fully replaces a document.
    Put {
        /// Target collection.
        collection: String,
        /// Document ID.
        id: String,
        /// Full document body; must be a JSON object.
        data: Value,
    },
    /// Shallow-merges fields into an existing document and unions lifecycle
    /// events into its `history` array.
    ///
    /// Fails the whole batch if the document does not exist.
    Merge {
        /// Target collection.
        collection: String,
        /// Document ID.
        id: String,
        /// Fields to overwrite; must be a JSON object.
        patch: Value,
        /// Lifecycle events to union into `history`, deduplicated by their
        /// `id` field.
        history: Vec<Value>,
    },
    /// Deletes a document. Succeeds even if it does not exist (idempotent).
    Delete {
        /// Target collection.
        collection: String,
        /// Document ID.
        id: String,
    },
}

/// An ordered set of write operations applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a put operation.
    #[must_use]
    pub fn put(mut self, collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        self.ops.push(WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            data,
        });
        self
    }

    /// Adds a merge operation with no history entries.
    #[must_use]
    pub fn merge(
        self,
        collection: impl Into<String>,
        id: impl Into<String>,
        patch: Value,
    ) -> Self {
        self.merge_with_history(collection, id, patch, Vec::new())
    }

    /// Adds a merge operation that also unions lifecycle events.
    #[must_use]
    pub fn merge_with_history(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        patch: Value,
        history: Vec<Value>,
    ) -> Self {
        self.ops.push(WriteOp::Merge {
            collection: collection.into(),
            id: id.into(),
            patch,
            history,
        });
        self
    }

    /// Adds a delete operation.
    #[must_use]
    pub fn delete(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
        self
    }

    /// The operations in application order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of operations in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch contains no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Notification that documents in a collection changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Name of the collection that changed.
    pub collection: String,
}

/// Storage contract for registry state.
///
/// Implementations must apply batches atomically and emit one
/// [`ChangeNotice`] per distinct collection a committed batch touched.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Lists every document in a collection.
    ///
    /// Returns an empty vec for an unknown collection. Results are ordered
    /// by document ID.
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Reads a single document, or `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Applies a batch atomically.
    ///
    /// If any operation is invalid (for instance a merge against a missing
    /// document), no operation in the batch is applied.
    async fn apply(&self, batch: WriteBatch) -> Result<()>;

    /// Subscribes to change notices for all collections.
    ///
    /// Slow subscribers may observe `Lagged` and should re-read the
    /// collections they mirror.
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice>;
}

/// In-memory document store.
///
/// Collections are `BTreeMap`s so listings come back in stable ID order.
#[derive(Debug)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
    notices: broadcast::Sender<ChangeNotice>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        let (notices, _) = broadcast::channel(256);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            notices,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require_object<'a>(data: &'a Value, what: &str) -> Result<&'a serde_json::Map<String, Value>> {
    data.as_object()
        .ok_or_else(|| Error::validation(format!("{what} must be a JSON object")))
}

/// Unions `incoming` events into the document's `history` array, keyed by
/// each event's `id` field. Entries without an `id` are appended as-is.
fn union_history(doc: &mut serde_json::Map<String, Value>, incoming: Vec<Value>) {
    if incoming.is_empty() {
        return;
    }
    let existing = doc
        .entry("history".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !existing.is_array() {
        *existing = Value::Array(Vec::new());
    }
    if let Value::Array(arr) = existing {
        for event in incoming {
            let seen = event
                .get("id")
                .map(|id| arr.iter().any(|e| e.get("id") == Some(id)))
                .unwrap_or(false);
            if !seen {
                arr.push(event);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(collections.get(collection).and_then(|docs| {
            docs.get(id).map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
        }))
    }

    async fn apply(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut collections = self.collections.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        // Validate every operation before mutating anything, tracking the
        // batch's own earlier writes so a put-then-merge sequence validates.
        let mut will_exist: HashMap<(String, String), bool> = HashMap::new();
        for op in batch.ops() {
            match op {
                WriteOp::Put {
                    collection, id, data,
                } => {
                    require_object(data, "document body")?;
                    will_exist.insert((collection.clone(), id.clone()), true);
                }
                WriteOp::Merge {
                    collection,
                    id,
                    patch,
                    ..
                } => {
                    require_object(patch, "merge patch")?;
                    let key = (collection.clone(), id.clone());
                    let exists = will_exist.get(&key).copied().unwrap_or_else(|| {
                        collections
                            .get(collection)
                            .is_some_and(|docs| docs.contains_key(id))
                    });
                    if !exists {
                        return Err(Error::NotFound(format!(
                            "cannot merge into missing document {collection}/{id}"
                        )));
                    }
                    will_exist.insert(key, true);
                }
                WriteOp::Delete { collection, id } => {
                    will_exist.insert((collection.clone(), id.clone()), false);
                }
            }
        }

        let mut touched: Vec<String> = Vec::new();
        for op in batch.ops {
            let collection_name = match &op {
                WriteOp::Put { collection, .. }
                | WriteOp::Merge { collection, .. }
                | WriteOp::Delete { collection, .. } => collection.clone(),
            };
            if !touched.contains(&collection_name) {
                touched.push(collection_name.clone());
            }

            let docs = collections.entry(collection_name).or_default();
            match op {
                WriteOp::Put { id, data, .. } => {
                    docs.insert(id, data);
                }
                WriteOp::Merge {
                    id, patch, history, ..
                } => {
                    // Existence was checked above.
                    let doc = docs
                        .get_mut(&id)
                        .and_then(Value::as_object_mut)
                        .ok_or_else(|| Error::internal("validated merge target vanished"))?;
                    for (key, value) in patch.as_object().cloned().unwrap_or_default() {
                        doc.insert(key, value);
                    }
                    union_history(doc, history);
                }
                WriteOp::Delete { id, .. } => {
                    docs.remove(&id);
                }
            }
        }
        drop(collections);

        for collection in touched {
            // No receivers is fine; snapshots simply are not being mirrored.
            let _ = self.notices.send(ChangeNotice { collection });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notices.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_list_roundtrip() {
        let store = MemoryStore::new();
        store
            .apply(WriteBatch::new().put("numbers", "n1", json!({"mobile": "9876543210"})))
            .await
            .expect("apply should succeed");

        let doc = store
            .get("numbers", "n1")
            .await
            .expect("get should succeed")
            .expect("document should exist");
        assert_eq!(doc.data["mobile"], "9876543210");

        let all = store.list("numbers").await.expect("list should succeed");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "n1");
    }

    #[tokio::test]
    async fn list_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let docs = store.list("nothing").await.expect("list should succeed");
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn merge_overwrites_fields_and_keeps_others() {
        let store = MemoryStore::new();
        store
            .apply(WriteBatch::new().put("numbers", "n1", json!({"a": 1, "b": 2})))
            .await
            .unwrap();

        store
            .apply(WriteBatch::new().merge("numbers", "n1", json!({"b": 3, "c": 4})))
            .await
            .expect("merge should succeed");

        let doc = store.get("numbers", "n1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[tokio::test]
    async fn merge_unions_history_by_event_id() {
        let store = MemoryStore::new();
        store
            .apply(WriteBatch::new().put(
                "numbers",
                "n1",
                json!({"history": [{"id": "e1", "action": "Created"}]}),
            ))
            .await
            .unwrap();

        // One duplicate and one new event; the duplicate must not double up.
        store
            .apply(WriteBatch::new().merge_with_history(
                "numbers",
                "n1",
                json!({}),
                vec![
                    json!({"id": "e1", "action": "Created"}),
                    json!({"id": "e2", "action": "Sold"}),
                ],
            ))
            .await
            .unwrap();

        let doc = store.get("numbers", "n1").await.unwrap().unwrap();
        let history = doc.data["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1]["id"], "e2");
    }

    #[tokio::test]
    async fn merge_into_missing_document_fails_whole_batch() {
        let store = MemoryStore::new();
        let result = store
            .apply(
                WriteBatch::new()
                    .put("numbers", "n1", json!({"a": 1}))
                    .merge("sales", "missing", json!({"b": 2})),
            )
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        // The put in the same batch must not have been applied.
        assert!(store.get("numbers", "n1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_after_put_in_same_batch_is_valid() {
        let store = MemoryStore::new();
        store
            .apply(
                WriteBatch::new()
                    .put("sales", "s1", json!({"price": 100}))
                    .merge("sales", "s1", json!({"price": 120})),
            )
            .await
            .expect("apply should succeed");

        let doc = store.get("sales", "s1").await.unwrap().unwrap();
        assert_eq!(doc.data["price"], 120);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store
            .apply(WriteBatch::new().delete("numbers", "ghost"))
            .await
            .expect("deleting a missing document should succeed");
    }

    #[tokio::test]
    async fn batch_moves_document_between_collections_atomically() {
        let store = MemoryStore::new();
        store
            .apply(WriteBatch::new().put("numbers", "n1", json!({"mobile": "9876543210"})))
            .await
            .unwrap();

        store
            .apply(
                WriteBatch::new()
                    .put("sales", "s1", json!({"mobile": "9876543210"}))
                    .delete("numbers", "n1"),
            )
            .await
            .unwrap();

        assert!(store.get("numbers", "n1").await.unwrap().is_none());
        assert!(store.get("sales", "s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn subscribers_get_one_notice_per_touched_collection() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store
            .apply(
                WriteBatch::new()
                    .put("numbers", "n1", json!({}))
                    .put("numbers", "n2", json!({}))
                    .put("sales", "s1", json!({})),
            )
            .await
            .unwrap();

        let first = rx.recv().await.expect("notice should arrive");
        let second = rx.recv().await.expect("notice should arrive");
        let mut got = vec![first.collection, second.collection];
        got.sort();
        assert_eq!(got, vec!["numbers", "sales"]);
    }

    #[tokio::test]
    async fn non_object_document_is_rejected() {
        let store = MemoryStore::new();
        let result = store
            .apply(WriteBatch::new().put("numbers", "n1", json!([1, 2, 3])))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
