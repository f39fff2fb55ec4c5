//! Card repository: durable reads/writes of cards and categories
//!
//! All counter bookkeeping funnels through a single atomic increment on
//! the store. The backend offers no cross-document transactions, so
//! multi-write operations (add, move, category deletion) are sequenced
//! explicitly; a mid-sequence failure leaves one of a small set of
//! explainable intermediate states, reported through the error so the
//! caller can reconcile.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;

use cardfolio_domain::{
    validate_contact_fields, Card, CardId, CardPatch, Category, CategoryId, CategoryPatch,
    ContactFields, NewCard, NewCategory, UserId, ValidationError, ValidationSeverity,
    DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON, DEFAULT_CATEGORY_NAME,
};
use cardfolio_store::{DocumentStore, Query, SortDescriptor, StoreError};

/// Collection names in the document store.
pub const CARDS: &str = "cards";
pub const CATEGORIES: &str = "categories";

/// The write that a failed `move_card` stopped at. Earlier phases have
/// already been applied; re-running from the failed phase onward (see
/// [`CardRepository::resume_move`]) completes the move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MovePhase {
    Repoint,
    DecrementSource,
    IncrementDestination,
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("owner id is required")]
    MissingOwner,

    #[error("category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("card not found: {0}")]
    CardNotFound(CardId),

    #[error("the default category cannot be renamed, re-iconed, or deleted")]
    DefaultCategoryProtected,

    #[error("cards cannot be moved into the category being deleted")]
    InvalidMoveTarget,

    #[error("contact fields failed validation")]
    InvalidFields(Vec<ValidationError>),

    #[error("move of card {card_id} interrupted at {failed:?}")]
    MoveInterrupted {
        card_id: CardId,
        failed: MovePhase,
        #[source]
        source: Box<RepositoryError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which cards to do what with when their category is deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteCategoryMode {
    /// Delete every card in the category along with it.
    DeleteCards,
    /// Re-point every card to the given category first.
    MoveTo(CategoryId),
}

/// Totals for the quick filter chips on the search screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub total: usize,
    pub favorites: usize,
    pub high_quality: usize,
}

pub struct CardRepository {
    store: Arc<dyn DocumentStore>,
}

fn require_owner(owner: &str) -> Result<(), RepositoryError> {
    if owner.trim().is_empty() {
        Err(RepositoryError::MissingOwner)
    } else {
        Ok(())
    }
}

fn require_valid_fields(fields: &ContactFields) -> Result<(), RepositoryError> {
    let findings: Vec<ValidationError> = validate_contact_fields(fields)
        .into_iter()
        .filter(|f| f.severity == ValidationSeverity::Error)
        .collect();
    if findings.is_empty() {
        Ok(())
    } else {
        Err(RepositoryError::InvalidFields(findings))
    }
}

/// Serialize a record and drop its `id` key; the store keeps ids outside
/// the document body.
fn body_without_id<T: serde::Serialize>(record: &T) -> Result<Value, RepositoryError> {
    let mut value =
        serde_json::to_value(record).map_err(|e| StoreError::Storage(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    Ok(value)
}

impl CardRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // === Categories ===

    /// Fetch all of a user's categories, ordered by their sort key, each
    /// enriched with the creation time of its newest card.
    pub fn get_user_categories(&self, owner: &UserId) -> Result<Vec<Category>, RepositoryError> {
        require_owner(owner)?;
        let docs = self.store.query(
            CATEGORIES,
            &Query::new()
                .filter_eq("userId", owner.clone())
                .order_by(SortDescriptor::ascending("order")),
        )?;

        let mut categories = Vec::with_capacity(docs.len());
        for doc in docs {
            let mut category: Category = doc.to_record()?;
            category.last_card_added_at = match self.newest_card_in(&category.id, owner) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(category = %category.name, error = %e, "newest-card lookup failed");
                    None
                }
            };
            categories.push(category);
        }
        Ok(categories)
    }

    fn newest_card_in(
        &self,
        category_id: &CategoryId,
        owner: &UserId,
    ) -> Result<Option<chrono::DateTime<Utc>>, RepositoryError> {
        let docs = self.store.query(
            CARDS,
            &Query::new()
                .filter_eq("categoryId", category_id.clone())
                .filter_eq("userId", owner.clone())
                .order_by(SortDescriptor::descending("createdAt"))
                .limit(1),
        )?;
        Ok(docs
            .first()
            .map(|doc| doc.to_record::<Card>())
            .transpose()?
            .map(|card| card.created_at))
    }

    pub fn add_category(
        &self,
        owner: &UserId,
        new: NewCategory,
    ) -> Result<Category, RepositoryError> {
        require_owner(owner)?;
        let created_at = Utc::now();
        let body = json!({
            "userId": owner,
            "name": new.name,
            "icon": new.icon,
            "color": new.color,
            "order": new.order,
            "cardCount": 0,
            "isDefault": false,
            "createdAt": created_at,
        });
        let doc = self.store.insert(CATEGORIES, body)?;
        tracing::info!(id = %doc.id, "category created");
        Ok(doc.to_record()?)
    }

    /// Idempotent: returns the existing default category when one exists,
    /// creating it only on first access. Safe to call on every start.
    pub fn create_default_category(&self, owner: &UserId) -> Result<Category, RepositoryError> {
        require_owner(owner)?;
        let existing = self.store.query(
            CATEGORIES,
            &Query::new()
                .filter_eq("userId", owner.clone())
                .filter_eq("isDefault", true),
        )?;
        if let Some(doc) = existing.first() {
            return Ok(doc.to_record()?);
        }
        let body = json!({
            "userId": owner,
            "name": DEFAULT_CATEGORY_NAME,
            "icon": DEFAULT_CATEGORY_ICON,
            "color": DEFAULT_CATEGORY_COLOR,
            "order": 0,
            "cardCount": 0,
            "isDefault": true,
            "createdAt": Utc::now(),
        });
        let doc = self.store.insert(CATEGORIES, body)?;
        tracing::info!(id = %doc.id, "default category created");
        Ok(doc.to_record()?)
    }

    /// Partial update. Renaming or re-iconing the default category is
    /// rejected here, not left to the UI.
    pub fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, RepositoryError> {
        if patch.is_empty() {
            return self.require_category(id);
        }
        let current = self.require_category(id)?;
        if current.is_default && patch.touches_identity() {
            return Err(RepositoryError::DefaultCategoryProtected);
        }
        self.store
            .update(CATEGORIES, id, body_without_id(&patch)?)
            .map_err(|e| self.map_category_not_found(e, id))?;
        self.require_category(id)
    }

    /// Delete a category, first dispatching its cards according to `mode`.
    /// The category document goes last, after every card mutation
    /// succeeded; a failure partway through leaves the category present
    /// with some cards already dispatched.
    pub fn delete_category(
        &self,
        id: &CategoryId,
        mode: DeleteCategoryMode,
    ) -> Result<(), RepositoryError> {
        let category = self.require_category(id)?;
        if category.is_default {
            return Err(RepositoryError::DefaultCategoryProtected);
        }
        if let DeleteCategoryMode::MoveTo(target) = &mode {
            if target == id {
                return Err(RepositoryError::InvalidMoveTarget);
            }
            self.require_category(target)?;
        }

        let docs = self
            .store
            .query(CARDS, &Query::new().filter_eq("categoryId", id.clone()))?;
        let count = docs.len() as i64;
        tracing::info!(category = %id, cards = count, ?mode, "deleting category");

        match &mode {
            DeleteCategoryMode::DeleteCards => {
                for doc in &docs {
                    self.store.delete(CARDS, &doc.id)?;
                }
            }
            DeleteCategoryMode::MoveTo(target) => {
                let moved_at = Utc::now();
                for doc in &docs {
                    self.store.update(
                        CARDS,
                        &doc.id,
                        json!({ "categoryId": target, "movedAt": moved_at }),
                    )?;
                }
                if count > 0 {
                    self.increment_category_card_count(target, count)?;
                }
            }
        }

        self.store
            .delete(CATEGORIES, id)
            .map_err(|e| self.map_category_not_found(e, id))?;
        Ok(())
    }

    /// The single primitive all counter maintenance goes through. Delegates
    /// to the store's atomic increment; negative deltas are legal and the
    /// result is not clamped at zero.
    pub fn increment_category_card_count(
        &self,
        id: &CategoryId,
        delta: i64,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .store
            .increment(CATEGORIES, id, "cardCount", delta)
            .map_err(|e| self.map_category_not_found(e, id))?;
        if count < 0 {
            tracing::warn!(category = %id, count, "category card count went negative");
        }
        Ok(count)
    }

    fn require_category(&self, id: &CategoryId) -> Result<Category, RepositoryError> {
        match self.store.get(CATEGORIES, id)? {
            Some(doc) => Ok(doc.to_record()?),
            None => Err(RepositoryError::CategoryNotFound(id.clone())),
        }
    }

    fn map_category_not_found(&self, e: StoreError, id: &CategoryId) -> RepositoryError {
        match e {
            StoreError::NotFound { .. } => RepositoryError::CategoryNotFound(id.clone()),
            other => other.into(),
        }
    }

    fn map_card_not_found(&self, e: StoreError, id: &CardId) -> RepositoryError {
        match e {
            StoreError::NotFound { .. } => RepositoryError::CardNotFound(id.clone()),
            other => other.into(),
        }
    }

    // === Cards ===

    /// Persist a new card, then bump its category's counter as a second,
    /// separate write. If the bump fails the card stays persisted and the
    /// counter has drifted; the error is propagated for the caller to
    /// surface.
    pub fn add_card(&self, new: NewCard) -> Result<Card, RepositoryError> {
        require_owner(&new.user_id)?;
        require_valid_fields(&new.fields)?;
        if let Some(category_id) = &new.category_id {
            self.require_category(category_id)?;
        }

        let card = Card {
            id: String::new(),
            user_id: new.user_id,
            category_id: new.category_id,
            category_name: new.category_name,
            fields: new.fields,
            is_favorite: false,
            qa_score: new.qa_score,
            qa_status: new.qa_status,
            image_url: new.image_url,
            voice_note: new.voice_note,
            created_at: new.created_at.unwrap_or_else(Utc::now),
            updated_at: None,
            moved_at: None,
        };
        let doc = self.store.insert(CARDS, body_without_id(&card)?)?;
        let card = Card {
            id: doc.id.clone(),
            ..card
        };
        tracing::info!(id = %card.id, "card persisted");

        if let Some(category_id) = &card.category_id {
            if let Err(e) = self.increment_category_card_count(category_id, 1) {
                tracing::warn!(
                    card = %card.id,
                    category = %category_id,
                    error = %e,
                    "card persisted but counter increment failed; count has drifted"
                );
                return Err(e);
            }
        }
        Ok(card)
    }

    pub fn get_card_by_id(&self, id: &CardId) -> Result<Option<Card>, RepositoryError> {
        Ok(self
            .store
            .get(CARDS, id)?
            .map(|doc| doc.to_record())
            .transpose()?)
    }

    /// Patch a card's editable surface and stamp `updatedAt`.
    pub fn update_card(&self, id: &CardId, patch: CardPatch) -> Result<Card, RepositoryError> {
        if let Some(fields) = &patch.fields {
            require_valid_fields(fields)?;
        }
        let mut body = body_without_id(&patch)?;
        if let Value::Object(map) = &mut body {
            map.insert("updatedAt".to_string(), json!(Utc::now()));
        }
        self.store
            .update(CARDS, id, body)
            .map_err(|e| self.map_card_not_found(e, id))?;
        self.get_card_by_id(id)?
            .ok_or_else(|| RepositoryError::CardNotFound(id.clone()))
    }

    pub fn set_favorite(&self, id: &CardId, is_favorite: bool) -> Result<Card, RepositoryError> {
        self.update_card(
            id,
            CardPatch {
                is_favorite: Some(is_favorite),
                ..Default::default()
            },
        )
    }

    /// Move a card between categories: three sequential writes (re-point,
    /// decrement source, increment destination). A failure after the first
    /// write reports the phase it stopped at; `resume_move` with that
    /// phase finishes the job.
    pub fn move_card(
        &self,
        card_id: &CardId,
        from: Option<&CategoryId>,
        to: &CategoryId,
    ) -> Result<Card, RepositoryError> {
        self.require_category(to)?;
        self.run_move(card_id, from, to, MovePhase::Repoint)
    }

    /// Re-run the remaining phases of an interrupted move.
    pub fn resume_move(
        &self,
        card_id: &CardId,
        from: Option<&CategoryId>,
        to: &CategoryId,
        failed: MovePhase,
    ) -> Result<Card, RepositoryError> {
        self.run_move(card_id, from, to, failed)
    }

    fn run_move(
        &self,
        card_id: &CardId,
        from: Option<&CategoryId>,
        to: &CategoryId,
        start: MovePhase,
    ) -> Result<Card, RepositoryError> {
        let interrupted = |failed: MovePhase, source: RepositoryError| {
            RepositoryError::MoveInterrupted {
                card_id: card_id.clone(),
                failed,
                source: Box::new(source),
            }
        };

        if start == MovePhase::Repoint {
            self.store
                .update(
                    CARDS,
                    card_id,
                    json!({ "categoryId": to, "movedAt": Utc::now() }),
                )
                .map_err(|e| self.map_card_not_found(e, card_id))?;
        }

        if start <= MovePhase::DecrementSource {
            if let Some(from) = from {
                self.increment_category_card_count(from, -1)
                    .map_err(|e| interrupted(MovePhase::DecrementSource, e))?;
            }
        }

        self.increment_category_card_count(to, 1)
            .map_err(|e| interrupted(MovePhase::IncrementDestination, e))?;

        tracing::info!(card = %card_id, to = %to, "card moved");
        self.get_card_by_id(card_id)?
            .ok_or_else(|| RepositoryError::CardNotFound(card_id.clone()))
    }

    /// Delete a card and decrement its category's counter.
    pub fn delete_card(&self, id: &CardId) -> Result<(), RepositoryError> {
        let card = self
            .get_card_by_id(id)?
            .ok_or_else(|| RepositoryError::CardNotFound(id.clone()))?;
        self.store
            .delete(CARDS, id)
            .map_err(|e| self.map_card_not_found(e, id))?;
        if let Some(category_id) = &card.category_id {
            if let Err(e) = self.increment_category_card_count(category_id, -1) {
                tracing::warn!(
                    card = %id,
                    category = %category_id,
                    error = %e,
                    "card deleted but counter decrement failed; count has drifted"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    // === Queries ===

    pub fn get_cards_by_category(
        &self,
        category_id: &CategoryId,
        owner: &UserId,
    ) -> Result<Vec<Card>, RepositoryError> {
        require_owner(owner)?;
        self.fetch_cards(
            Query::new()
                .filter_eq("categoryId", category_id.clone())
                .filter_eq("userId", owner.clone())
                .order_by(SortDescriptor::descending("createdAt")),
        )
    }

    pub fn get_all_user_cards(&self, owner: &UserId) -> Result<Vec<Card>, RepositoryError> {
        require_owner(owner)?;
        self.fetch_cards(
            Query::new()
                .filter_eq("userId", owner.clone())
                .order_by(SortDescriptor::descending("createdAt")),
        )
    }

    pub fn get_recent_cards(
        &self,
        owner: &UserId,
        limit: usize,
    ) -> Result<Vec<Card>, RepositoryError> {
        require_owner(owner)?;
        self.fetch_cards(
            Query::new()
                .filter_eq("userId", owner.clone())
                .order_by(SortDescriptor::descending("createdAt"))
                .limit(limit),
        )
    }

    pub fn get_favorite_cards(&self, owner: &UserId) -> Result<Vec<Card>, RepositoryError> {
        require_owner(owner)?;
        self.fetch_cards(
            Query::new()
                .filter_eq("userId", owner.clone())
                .filter_eq("isFavorite", true)
                .order_by(SortDescriptor::descending("createdAt")),
        )
    }

    fn fetch_cards(&self, query: Query) -> Result<Vec<Card>, RepositoryError> {
        let docs = self.store.query(CARDS, &query)?;
        docs.iter()
            .map(|doc| doc.to_record().map_err(RepositoryError::from))
            .collect()
    }
}

impl std::fmt::Debug for CardRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardRepository").finish_non_exhaustive()
    }
}
