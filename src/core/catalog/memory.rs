//! In-memory catalogue backend for testing.

use super::{normalize_tags, CatalogItem, CatalogStats, CatalogStore, NewItem};
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    /// Insertion order is listing order
    items: Vec<CatalogItem>,
    /// Lowercased name to first-seen spelling; tags outlive their items
    tags: BTreeMap<String, String>,
}

impl State {
    fn remember_tags(&mut self, tags: &[String]) {
        for tag in tags {
            self.tags
                .entry(tag.to_lowercase())
                .or_insert_with(|| tag.clone());
        }
    }
}

/// In-memory catalogue backend
///
/// Useful for testing and scenarios where persistence isn't needed.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<State>,
}

impl InMemoryCatalog {
    /// Create an empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Corrupted {
            path: PathBuf::from("memory"),
        }
    }
}

impl CatalogStore for InMemoryCatalog {
    fn add(&self, item: NewItem) -> Result<CatalogItem, StoreError> {
        let item = item.into_item()?;
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        state.remember_tags(&item.tags);
        state.items.push(item.clone());
        Ok(item)
    }

    fn get(&self, id: Uuid) -> Result<Option<CatalogItem>, StoreError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.items.iter().find(|item| item.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<CatalogItem>, StoreError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.items.clone())
    }

    fn update_tags(&self, id: Uuid, tags: &[String]) -> Result<CatalogItem, StoreError> {
        let tags = normalize_tags(tags);
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        state.remember_tags(&tags);
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| StoreError::ItemNotFound { id: id.to_string() })?;

        item.tags = tags;
        Ok(item.clone())
    }

    fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;

        let before = state.items.len();
        state.items.retain(|item| item.id != id);
        if state.items.len() == before {
            return Err(StoreError::ItemNotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn tags_matching(&self, query: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let needle = query.trim().to_lowercase();
        let state = self.state.read().map_err(|_| Self::poisoned())?;

        Ok(state
            .tags
            .iter()
            .filter(|(key, _)| key.contains(&needle))
            .map(|(_, name)| name.clone())
            .take(limit)
            .collect())
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(CatalogStats {
            item_count: state.items.len(),
            tag_count: state.tags.len(),
        })
    }
}
