//! Document store protocol for cardfolio
//!
//! The durable backend is an external collaborator with Firestore-like
//! capabilities: keyed JSON documents grouped into named collections, with
//! equality/order/limit queries and an atomic numeric field increment. This
//! crate defines that contract plus two implementations: an in-memory store
//! (tests, ephemeral sessions) and a SQLite-backed store behind the
//! `sqlite` feature.

pub mod memory;
pub mod query;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use query::{Filter, Query, SortDescriptor};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use store::{Document, DocumentId, DocumentStore, StoreError};
