//! Item persistence.
//!
//! # Responsibilities
//! - Define the data-access seam used by handlers
//! - Provide an in-memory implementation
//!
//! # Design Decisions
//! - Calls are synchronous; the in-memory store never blocks for long
//! - The store stamps `date_entered` at insert time
//! - Listing order is stable: entry date, then id

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::inventory::model::Item;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(Uuid),

    #[error("item {0} already exists")]
    Duplicate(Uuid),

    /// Backend unreachable or failing.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Data access for fridge items.
pub trait ItemStore: Send + Sync {
    fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    fn get_item(&self, id: Uuid) -> Result<Item, StoreError>;

    fn insert_item(&self, id: Uuid, name: &str, date_expiry: DateTime<Utc>) -> Result<(), StoreError>;
}

/// A thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<DashMap<Uuid, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemStore for MemoryStore {
    fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<Item> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by(|a, b| a.date_entered.cmp(&b.date_entered).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    fn get_item(&self, id: Uuid) -> Result<Item, StoreError> {
        self.items
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn insert_item(&self, id: Uuid, name: &str, date_expiry: DateTime<Utc>) -> Result<(), StoreError> {
        match self.items.entry(id) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(id)),
            Entry::Vacant(slot) => {
                slot.insert(Item {
                    id,
                    name: name.to_string(),
                    date_entered: Utc::now(),
                    date_expiry,
                });
            }
        }
        // The shard lock is released once the entry is gone.
        tracing::debug!(id = %id, items = self.items.len(), "Item inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.insert_item(id, "Eggs", expiry()).unwrap();

        let item = store.get_item(id).unwrap();
        assert_eq!(item.name, "Eggs");
        assert_eq!(item.date_expiry, expiry());
        assert!(item.date_entered <= Utc::now());
    }

    #[test]
    fn test_get_missing() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.get_item(id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.insert_item(id, "Eggs", expiry()).unwrap();

        assert!(matches!(store.insert_item(id, "Ham", expiry()), Err(StoreError::Duplicate(_))));
        assert_eq!(store.get_item(id).unwrap().name, "Eggs");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_in_entry_order() {
        let store = MemoryStore::new();
        for name in ["Milk", "Butter", "Cheese"] {
            store.insert_item(Uuid::new_v4(), name, expiry()).unwrap();
        }

        let items = store.list_items().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.windows(2).all(|w| w[0].date_entered <= w[1].date_entered));
    }
}
