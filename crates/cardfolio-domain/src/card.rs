//! Card representation: a persisted contact record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CardId, CategoryId, ContactFields, UserId, VoiceNote};

/// Outcome class reported by the recognition service for a card scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QaStatus {
    Passed,
    Review,
    Failed,
    /// Locally synthesized fallback result; the recognition service was
    /// unreachable and these fields are placeholders.
    Mock,
    Unknown,
}

impl Default for QaStatus {
    fn default() -> Self {
        QaStatus::Unknown
    }
}

/// A contact record derived from a recognized card image.
///
/// A card only exists in the store after the user explicitly confirmed a
/// draft; there is no partially persisted form. `category_id`, when set,
/// references a category owned by the same user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Folder name denormalized at capture time, for display without a
    /// second lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default)]
    pub fields: ContactFields,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_status: Option<QaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_note: Option<VoiceNote>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_at: Option<DateTime<Utc>>,
}

/// Input for persisting a card. The repository assigns the id and, unless a
/// capture timestamp is supplied, the creation time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub user_id: UserId,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub fields: ContactFields,
    pub qa_score: Option<f64>,
    pub qa_status: Option<QaStatus>,
    pub image_url: Option<String>,
    pub voice_note: Option<VoiceNote>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update to a card's editable surface. Moves and deletions have
/// dedicated repository operations because of the counter bookkeeping.
/// Absent fields serialize to nothing, so a patch never nulls out what it
/// does not name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ContactFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_none() && self.is_favorite.is_none()
    }
}
