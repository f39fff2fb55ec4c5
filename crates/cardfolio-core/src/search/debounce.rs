//! Debounced incremental search
//!
//! One search per pause in typing instead of one per keystroke. Each new
//! input aborts the pending search; results reach the UI through a watch
//! channel that always holds the latest snapshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use cardfolio_domain::{Card, UserId};

use super::{SearchClient, SearchFilters};

/// Latest search outcome. `error` carries a display message when the
/// underlying fetch failed; `cards` is empty in that case.
#[derive(Clone, Debug, Default)]
pub struct SearchSnapshot {
    pub query: String,
    pub cards: Vec<Card>,
    pub error: Option<String>,
}

pub struct DebouncedSearch {
    client: Arc<SearchClient>,
    owner: UserId,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    tx: watch::Sender<SearchSnapshot>,
}

impl DebouncedSearch {
    pub fn new(
        client: Arc<SearchClient>,
        owner: UserId,
        delay: Duration,
    ) -> (Self, watch::Receiver<SearchSnapshot>) {
        let (tx, rx) = watch::channel(SearchSnapshot::default());
        (
            Self {
                client,
                owner,
                delay,
                pending: Mutex::new(None),
                tx,
            },
            rx,
        )
    }

    /// Feed the current input. An empty query publishes an empty snapshot
    /// at once, with no store access; anything else (re)schedules a search
    /// after the debounce delay.
    pub fn input(&self, query: &str, filters: SearchFilters) {
        self.cancel();

        let query = query.trim().to_string();
        if query.is_empty() {
            let _ = self.tx.send(SearchSnapshot::default());
            return;
        }

        let client = Arc::clone(&self.client);
        let owner = self.owner.clone();
        let delay = self.delay;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let snapshot = match client.search(&owner, &query, &filters) {
                Ok(cards) => SearchSnapshot {
                    query,
                    cards,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "debounced search failed");
                    SearchSnapshot {
                        query,
                        cards: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            let _ = tx.send(snapshot);
        });
        *self.pending.lock().unwrap() = Some(handle);
    }

    /// Abort any search still waiting on its timer.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.cancel();
    }
}
