//! SQLite-backed document store
//!
//! One `documents` table keyed by (collection, id) with the JSON body as
//! text. Counter increments run inside an immediate transaction, so they
//! are atomic across processes sharing the database file.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::{compare_values, Filter, Query};
use crate::store::{Document, DocumentStore, StoreError};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn storage(e: rusqlite::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(storage)?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            ",
        )
        .map_err(storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_body(body: &str) -> Result<Map<String, Value>, StoreError> {
        match serde_json::from_str(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::NotAnObject),
            Err(e) => Err(StoreError::Storage(format!("corrupt document body: {e}"))),
        }
    }

    fn as_object(body: Value) -> Result<Map<String, Value>, StoreError> {
        match body {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }
}

impl DocumentStore for SqliteStore {
    fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let map = Self::as_object(body)?;
        let id = Uuid::new_v4().to_string();
        let encoded =
            serde_json::to_string(&map).map_err(|e| StoreError::Storage(e.to_string()))?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection, id, encoded],
        )
        .map_err(storage)?;
        Ok(Document {
            id,
            body: Value::Object(map),
        })
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        match body {
            Some(body) => Ok(Some(Document {
                id: id.to_string(),
                body: Value::Object(Self::parse_body(&body)?),
            })),
            None => Ok(None),
        }
    }

    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let patch = Self::as_object(patch)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(storage)?;
        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        let mut map = match body {
            Some(body) => Self::parse_body(&body)?,
            None => {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
        };
        for (key, value) in patch {
            map.insert(key, value);
        }
        let encoded =
            serde_json::to_string(&map).map_err(|e| StoreError::Storage(e.to_string()))?;
        tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection, id, encoded],
        )
        .map_err(storage)?;
        tx.commit().map_err(storage)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .map_err(storage)?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, body FROM documents WHERE collection = ?1")
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(storage)?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row.map_err(storage)?;
            let map = Self::parse_body(&body)?;
            let matches = query.filters.iter().all(|f| match f {
                Filter::Eq(field, expected) => map.get(field) == Some(expected),
            });
            if matches {
                docs.push(Document {
                    id,
                    body: Value::Object(map),
                });
            }
        }

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
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(storage)?;
        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        let mut map = match body {
            Some(body) => Self::parse_body(&body)?,
            None => {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
        };
        let current = match map.get(field) {
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
        map.insert(field.to_string(), Value::from(next));
        let encoded =
            serde_json::to_string(&map).map_err(|e| StoreError::Storage(e.to_string()))?;
        tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection, id, encoded],
        )
        .map_err(storage)?;
        tx.commit().map_err(storage)?;
        Ok(next)
    }
}
