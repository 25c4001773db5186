//! Catalogue backend trait definition.

use super::{CatalogItem, CatalogStats, NewItem};
use crate::error::StoreError;
use uuid::Uuid;

/// Trait for catalogue backends
pub trait CatalogStore: Send + Sync {
    /// Validate and store a new item, returning it with its id
    fn add(&self, item: NewItem) -> Result<CatalogItem, StoreError>;

    /// Store several items in one go.
    ///
    /// Backends with transactions should override this; the default just
    /// calls `add` for each item.
    fn add_batch(&self, items: Vec<NewItem>) -> Result<Vec<CatalogItem>, StoreError> {
        items.into_iter().map(|item| self.add(item)).collect()
    }

    /// Look up an item by id
    fn get(&self, id: Uuid) -> Result<Option<CatalogItem>, StoreError>;

    /// Snapshot of every item, oldest first
    fn list(&self) -> Result<Vec<CatalogItem>, StoreError>;

    /// Replace an item's tags
    fn update_tags(&self, id: Uuid, tags: &[String]) -> Result<CatalogItem, StoreError>;

    /// Delete an item
    ///
    /// Fails with `ItemNotFound` if the id is unknown.
    fn remove(&self, id: Uuid) -> Result<(), StoreError>;

    /// Items whose name, description or tags contain `query`, ignoring case
    fn search_text(&self, query: &str) -> Result<Vec<CatalogItem>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|item| item.matches_text(query))
            .collect())
    }

    /// Known tag names containing `query`, ignoring case, sorted by name
    fn tags_matching(&self, query: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Item and tag counts
    fn stats(&self) -> Result<CatalogStats, StoreError>;
}
