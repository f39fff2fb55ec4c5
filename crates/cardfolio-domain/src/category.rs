//! Category (folder) representation for grouping cards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, UserId};

/// Name given to the per-user default category created on first access.
pub const DEFAULT_CATEGORY_NAME: &str = "General";
/// Icon glyph of the default category.
pub const DEFAULT_CATEGORY_ICON: &str = "📋";
/// Color of the default category.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

/// A named, owned folder of cards.
///
/// `card_count` is denormalized: it must equal the number of cards whose
/// `category_id` references this category once an operation completes. The
/// backing store offers no transactions, so the count can drift when a
/// multi-write operation fails partway through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub card_count: i64,
    pub is_default: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_card_added_at: Option<DateTime<Utc>>,
}

/// Input for creating a category. The repository assigns id, owner,
/// `card_count = 0`, and the creation timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
    pub order: i64,
}

/// Partial update to a category. Absent fields are left untouched and do
/// not serialize, so a patch never nulls out what it does not name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl CategoryPatch {
    /// Whether the patch would change the fields that are frozen on the
    /// default category.
    pub fn touches_identity(&self) -> bool {
        self.name.is_some() || self.icon.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.icon.is_none() && self.color.is_none() && self.order.is_none()
    }
}
