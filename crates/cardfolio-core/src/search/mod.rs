//! Full-text card search
//!
//! The backing store only answers equality queries, so search fetches the
//! candidate cards (one category, or a fan-out across all of the owner's
//! categories) and filters client-side: a case-insensitive substring match
//! against each contact field, plus optional favorites and minimum-score
//! filters, newest first. Matched queries land in a small local history
//! for quick re-issue.

mod debounce;
mod history;

pub use debounce::{DebouncedSearch, SearchSnapshot};
pub use history::{HistoryError, HistoryStore, JsonFileHistory, MemoryHistory, SearchHistory};

use std::sync::Arc;

use thiserror::Error;

use cardfolio_domain::{Card, CategoryId, UserId};

use crate::repository::{CardRepository, FilterCounts, RepositoryError};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Optional narrowing applied after the text match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchFilters {
    /// Search only within one category instead of fanning out.
    pub category_id: Option<CategoryId>,
    pub only_favorites: bool,
    pub min_qa_score: Option<f64>,
}

pub struct SearchClient {
    repository: Arc<CardRepository>,
    history: SearchHistory,
    high_quality_threshold: f64,
}

impl SearchClient {
    pub fn new(
        repository: Arc<CardRepository>,
        history: SearchHistory,
        high_quality_threshold: f64,
    ) -> Self {
        Self {
            repository,
            history,
            high_quality_threshold,
        }
    }

    /// Run a search. An empty or whitespace query returns an empty result
    /// immediately, without touching the store.
    pub fn search(
        &self,
        owner: &UserId,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Card>, SearchError> {
        let term = query.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut cards = self.candidates(owner, filters)?;
        let needle = term.to_lowercase();
        cards.retain(|card| card_matches(card, &needle));

        if filters.only_favorites {
            cards.retain(|card| card.is_favorite);
        }
        if let Some(min) = filters.min_qa_score {
            cards.retain(|card| card.qa_score.unwrap_or(0.0) >= min);
        }

        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!(query = term, hits = cards.len(), "search completed");

        // History failures are logged, never fatal: the query itself
        // succeeded and the history list is cosmetic.
        if let Err(e) = self.history.add(term) {
            tracing::warn!(error = %e, "failed to record search history");
        }
        Ok(cards)
    }

    fn candidates(
        &self,
        owner: &UserId,
        filters: &SearchFilters,
    ) -> Result<Vec<Card>, SearchError> {
        if let Some(category_id) = &filters.category_id {
            return Ok(self.repository.get_cards_by_category(category_id, owner)?);
        }
        let mut cards = Vec::new();
        for category in self.repository.get_user_categories(owner)? {
            cards.extend(self.repository.get_cards_by_category(&category.id, owner)?);
        }
        Ok(cards)
    }

    /// Totals for the quick filter chips: all cards, favorites, and cards
    /// at or above the high-quality score threshold.
    pub fn filter_counts(&self, owner: &UserId) -> Result<FilterCounts, SearchError> {
        let cards = self.candidates(owner, &SearchFilters::default())?;
        Ok(FilterCounts {
            total: cards.len(),
            favorites: cards.iter().filter(|c| c.is_favorite).count(),
            high_quality: cards
                .iter()
                .filter(|c| c.qa_score.unwrap_or(0.0) >= self.high_quality_threshold)
                .count(),
        })
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }
}

fn card_matches(card: &Card, needle: &str) -> bool {
    card.fields
        .searchable_values()
        .iter()
        .any(|value| value.to_lowercase().contains(needle))
}
