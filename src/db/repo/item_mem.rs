use crate::db::DbResult;
use crate::db::error::DbError;
use crate::db::repo::ItemRepo;
use crate::models::item::ItemDefinition;
use crate::models::types::ItemId;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Catalog kept in process memory. Used by tests and by the CLI when no database is configured.
#[derive(Default)]
pub struct MemoryItemRepository {
    items: DashMap<ItemId, ItemDefinition>,
}

impl MemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepo for MemoryItemRepository {
    async fn insert(&self, item: &ItemDefinition) -> DbResult<()> {
        match self.items.entry(item.id) {
            Entry::Occupied(_) => Err(DbError::UniqueViolation),
            Entry::Vacant(v) => {
                v.insert(item.clone());
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, id: ItemId) -> DbResult<Option<ItemDefinition>> {
        Ok(self.items.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_name(&self, name: &str) -> DbResult<Vec<ItemDefinition>> {
        let needle = name.trim().to_lowercase();
        let mut items: Vec<ItemDefinition> = self
            .items
            .iter()
            .filter(|r| r.value().name.to_lowercase() == needle)
            .map(|r| r.value().clone())
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    async fn max_id(&self) -> DbResult<Option<ItemId>> {
        Ok(self.items.iter().map(|r| *r.key()).max())
    }

    async fn list(&self) -> DbResult<Vec<ItemDefinition>> {
        let mut items: Vec<ItemDefinition> = self.items.iter().map(|r| r.value().clone()).collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }
}
