//! Structured contact fields extracted from a card image

use serde::{Deserialize, Serialize};

/// Contact fields recognized on a business card. All optional: recognition
/// regularly comes back with gaps, and the user can fill them in later.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactFields {
    pub name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub service: Option<String>,
}

impl ContactFields {
    /// All text values in declaration order, skipping empty fields.
    /// This is the searchable surface of a card.
    pub fn searchable_values(&self) -> Vec<&str> {
        [
            &self.name,
            &self.company,
            &self.email,
            &self.mobile,
            &self.phone,
            &self.title,
            &self.address,
            &self.website,
            &self.service,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .filter(|s| !s.is_empty())
        .collect()
    }

    /// True when no field carries any text.
    pub fn is_empty(&self) -> bool {
        self.searchable_values().is_empty()
    }
}
