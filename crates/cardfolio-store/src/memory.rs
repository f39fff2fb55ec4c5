//! In-memory document store
//!
//! Used by tests and as the ephemeral backend. All mutations run under one
//! mutex, which trivially satisfies the atomic-increment contract.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::{compare_values, Filter, Query};
use crate::store::{Document, DocumentStore, StoreError};

type Collection = BTreeMap<String, Map<String, Value>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn as_object(body: Value) -> Result<Map<String, Value>, StoreError> {
        match body {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let map = Self::as_object(body)?;
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), map.clone());
        Ok(Document {
            id,
            body: Value::Object(map),
        })
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|map| Document {
                id: id.to_string(),
                body: Value::Object(map.clone()),
            }))
    }

    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let patch = Self::as_object(patch)?;
        let mut collections = self.collections.lock().unwrap();
        let doc = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (key, value) in patch {
            doc.insert(key, value);
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let removed = collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some();
        if removed {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, map)| {
                        query.filters.iter().all(|f| match f {
                            Filter::Eq(field, expected) => map.get(field) == Some(expected),
                        })
                    })
                    .map(|(id, map)| Document {
                        id: id.clone(),
                        body: Value::Object(map.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.body.get(&sort.field), b.body.get(&sort.field));
                if sort.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let doc = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let current = match doc.get(field) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| StoreError::NotANumber {
                field: field.to_string(),
            })?,
            Some(_) => {
                return Err(StoreError::NotANumber {
                    field: field.to_string(),
                })
            }
        };
        let next = current + delta;
        doc.insert(field.to_string(), Value::from(next));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDescriptor;
    use serde_json::json;

    #[test]
    fn insert_get_round_trip() {
        let store = MemoryStore::new();
        let doc = store
            .insert("cards", json!({"userId": "u1", "name": "Jane"}))
            .unwrap();
        let fetched = store.get("cards", &doc.id).unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[test]
    fn insert_rejects_non_object() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert("cards", json!("just a string")),
            Err(StoreError::NotAnObject)
        ));
    }

    #[test]
    fn update_merges_shallowly() {
        let store = MemoryStore::new();
        let doc = store
            .insert("cards", json!({"name": "Jane", "isFavorite": false}))
            .unwrap();
        store
            .update("cards", &doc.id, json!({"isFavorite": true}))
            .unwrap();
        let fetched = store.get("cards", &doc.id).unwrap().unwrap();
        assert_eq!(fetched.body["isFavorite"], true);
        assert_eq!(fetched.body["name"], "Jane");
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update("cards", "nope", json!({"a": 1})),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete("cards", "nope"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (user, created) in [("u1", "2024-01-02"), ("u1", "2024-01-03"), ("u2", "2024-01-01")] {
            store
                .insert("cards", json!({"userId": user, "createdAt": created}))
                .unwrap();
        }
        let docs = store
            .query(
                "cards",
                &Query::new()
                    .filter_eq("userId", "u1")
                    .order_by(SortDescriptor::descending("createdAt"))
                    .limit(1),
            )
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body["createdAt"], "2024-01-03");
    }

    #[test]
    fn increment_creates_goes_negative_and_returns_new_value() {
        let store = MemoryStore::new();
        let doc = store.insert("categories", json!({"name": "General"})).unwrap();
        assert_eq!(store.increment("categories", &doc.id, "cardCount", 2).unwrap(), 2);
        assert_eq!(store.increment("categories", &doc.id, "cardCount", -3).unwrap(), -1);
    }

    #[test]
    fn increment_rejects_non_numeric_field() {
        let store = MemoryStore::new();
        let doc = store.insert("categories", json!({"name": "General"})).unwrap();
        assert!(matches!(
            store.increment("categories", &doc.id, "name", 1),
            Err(StoreError::NotANumber { .. })
        ));
    }

    #[test]
    fn concurrent_increments_do_not_lose_updates() {
        use std::sync::Arc;
        let store = Arc::new(MemoryStore::new());
        let doc = store
            .insert("categories", json!({"cardCount": 0}))
            .unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let id = doc.id.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    store.increment("categories", &id, "cardCount", 1).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let fetched = store.get("categories", &doc.id).unwrap().unwrap();
        assert_eq!(fetched.body["cardCount"], 400);
    }
}
