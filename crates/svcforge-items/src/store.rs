use crate::model::{Item, ItemChanges};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Keyed item storage. Each method is exactly one storage operation.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Item>, StoreError>;

    async fn put(&self, item: &Item) -> Result<(), StoreError>;

    /// Apply `changes` to an existing item and return it, or `None` if absent.
    async fn update(&self, id: &str, changes: &ItemChanges) -> Result<Option<Item>, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn scan(&self) -> Result<Vec<Item>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    items: RwLock<BTreeMap<String, Item>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("item store lock poisoned".to_string())
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn get(&self, id: &str) -> Result<Option<Item>, StoreError> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(id).cloned())
    }

    async fn put(&self, item: &Item) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(poisoned)?;
        items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update(&self, id: &str, changes: &ItemChanges) -> Result<Option<Item>, StoreError> {
        let mut items = self.items.write().map_err(poisoned)?;
        Ok(items.get_mut(id).map(|item| {
            changes.apply(item);
            item.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(poisoned)?;
        items.remove(id);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Item>, StoreError> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.values().cloned().collect())
    }
}
