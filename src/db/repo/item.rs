use crate::db::DbResult;
use crate::models::item::ItemDefinition;
use crate::models::types::ItemId;

#[async_trait::async_trait]
pub trait ItemRepo: Send + Sync {
    /// Stores a new definition. Fails with `UniqueViolation` when the id is taken.
    async fn insert(&self, item: &ItemDefinition) -> DbResult<()>;
    async fn get_by_id(&self, id: ItemId) -> DbResult<Option<ItemDefinition>>;
    /// Every definition with this name, compared case-insensitively, ordered by id.
    async fn find_by_name(&self, name: &str) -> DbResult<Vec<ItemDefinition>>;
    /// Highest id in use, if any item exists
    async fn max_id(&self) -> DbResult<Option<ItemId>>;
    async fn list(&self) -> DbResult<Vec<ItemDefinition>>;
}
