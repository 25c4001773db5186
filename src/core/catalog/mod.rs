//! # Catalog Module
//!
//! Stores catalogue items together with their fingerprints.
//!
//! ## Backends
//! - `SqliteCatalog` - Persistent storage using SQLite
//! - `InMemoryCatalog` - For testing and throwaway sessions
//!
//! Ranking never queries a store directly: callers take a snapshot with
//! [`CatalogStore::list`] and hand it to the ranker.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCatalog;
pub use sqlite::SqliteCatalog;
pub use traits::CatalogStore;

use crate::core::fingerprint::Fingerprint;
use crate::core::ranking::Fingerprinted;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of suggestions returned by tag lookups
pub const TAG_SUGGESTION_LIMIT: usize = 10;

/// A photo of a physical item and what is known about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Where the full-size photo lives, if it was uploaded somewhere
    pub photo_url: Option<String>,
    /// Letterboxed capture as a `data:image/jpeg;base64,` URL
    pub thumbnail: Option<String>,
    pub tags: Vec<String>,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Case-insensitive substring match over name, description and tags
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

impl Fingerprinted for CatalogItem {
    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Input for creating a catalogue item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub fingerprint: Fingerprint,
}

impl NewItem {
    pub fn new(name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            photo_url: None,
            thumbnail: None,
            tags: Vec::new(),
            fingerprint,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    pub fn thumbnail(mut self, data_url: impl Into<String>) -> Self {
        self.thumbnail = Some(data_url.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Check the item and stamp it with a fresh id and creation time
    pub fn into_item(self) -> Result<CatalogItem, StoreError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::InvalidItem("name must not be empty".to_string()));
        }
        if self.fingerprint.is_empty() {
            return Err(StoreError::InvalidItem(
                "fingerprint must not be empty".to_string(),
            ));
        }

        Ok(CatalogItem {
            id: Uuid::new_v4(),
            name,
            description: self.description.trim().to_string(),
            photo_url: self.photo_url,
            thumbnail: self.thumbnail,
            tags: normalize_tags(&self.tags),
            fingerprint: self.fingerprint,
            created_at: Utc::now(),
        })
    }
}

/// Trim tags, drop blanks and keep the first spelling of case-insensitive duplicates
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Catalogue size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub item_count: usize,
    pub tag_count: usize,
}
