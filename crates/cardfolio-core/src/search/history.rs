//! Recent-query history
//!
//! A small, device-scoped list of past searches: most recent first,
//! de-duplicated, capped. Stored outside the document store because it
//! belongs to the device, not the account.

use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history io: {0}")]
    Io(#[from] std::io::Error),
    #[error("history parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where the history list lives. Implementations only persist a flat list
/// of strings; ordering and capping happen in [`SearchHistory`].
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<String>, HistoryError>;
    fn save(&self, entries: &[String]) -> Result<(), HistoryError>;
}

/// In-memory history, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Result<Vec<String>, HistoryError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    fn save(&self, entries: &[String]) -> Result<(), HistoryError> {
        *self.entries.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

/// File-backed history: one JSON array of strings.
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Conventional per-device location, if the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("cardfolio").join("search_history.json"))
    }
}

impl HistoryStore for JsonFileHistory {
    fn load(&self) -> Result<Vec<String>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, entries: &[String]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(entries)?)?;
        Ok(())
    }
}

/// The capped, de-duplicated recent-query list.
pub struct SearchHistory {
    store: Box<dyn HistoryStore>,
    limit: usize,
}

impl SearchHistory {
    pub fn new(store: Box<dyn HistoryStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Record a query at the front, dropping any earlier duplicate and
    /// trimming to the cap. Blank queries are ignored.
    pub fn add(&self, query: &str) -> Result<(), HistoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        let mut entries = self.store.load()?;
        entries.retain(|entry| entry != query);
        entries.insert(0, query.to_string());
        entries.truncate(self.limit);
        self.store.save(&entries)
    }

    pub fn entries(&self) -> Result<Vec<String>, HistoryError> {
        self.store.load()
    }

    pub fn remove(&self, query: &str) -> Result<(), HistoryError> {
        let mut entries = self.store.load()?;
        entries.retain(|entry| entry != query);
        self.store.save(&entries)
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        self.store.save(&[])
    }
}
