use crate::db::error::DbError;
use crate::db::repo::ItemRepo;
use crate::error::{AppResult, DomainError};
use crate::models::item::{Category, ItemDefinition, ItemDraft, ItemKind, Rarity};
use crate::models::types::ItemId;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The item catalog. Definitions are immutable once created and ids are handed out sequentially.
pub struct CatalogService {
    repo: Arc<dyn ItemRepo>,
    // id assignment reads max(id) and then inserts
    create_lock: Mutex<()>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn ItemRepo>) -> Self {
        Self {
            repo,
            create_lock: Mutex::new(()),
        }
    }

    /// Adds a definition under the next free id.
    pub async fn create(&self, draft: ItemDraft) -> AppResult<ItemDefinition> {
        let _guard = self.create_lock.lock().await;
        self.insert_next(draft).await
    }

    /// Builds the definition from positional category arguments, as typed on a command line.
    pub async fn create_from_args<S: AsRef<str>>(
        &self,
        category: Category,
        name: &str,
        desc: &str,
        price: u32,
        rarity: Rarity,
        args: &[S],
    ) -> AppResult<ItemDefinition> {
        let kind = ItemKind::from_args(category, args)?;
        self.create(ItemDraft {
            name: name.to_string(),
            desc: desc.to_string(),
            price,
            rarity,
            kind,
        })
        .await
    }

    /// Inserts all drafts in order. Stops at the first failure; items created before it stay.
    pub async fn import(&self, drafts: Vec<ItemDraft>) -> AppResult<Vec<ItemDefinition>> {
        let _guard = self.create_lock.lock().await;

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            created.push(self.insert_next(draft).await?);
        }
        tracing::info!(count = created.len(), "imported item catalog");
        Ok(created)
    }

    async fn insert_next(&self, draft: ItemDraft) -> AppResult<ItemDefinition> {
        let id = self.repo.max_id().await?.map_or(ItemId::FIRST, ItemId::next);
        let item = ItemDefinition::new(id, draft)?;

        match self.repo.insert(&item).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation) => {
                return Err(DomainError::InvariantViolated(format!("item id {id} was taken concurrently")));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(item_id = %item.id, name = %item.name, category = %item.category(), "created item");
        Ok(item)
    }

    pub async fn get_by_id(&self, id: ItemId) -> AppResult<ItemDefinition> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))
    }

    /// All definitions with the given name. Picking one of several is up to the caller.
    pub async fn get_by_name(&self, name: &str) -> AppResult<Vec<ItemDefinition>> {
        let items = self.repo.find_by_name(name).await?;
        if items.is_empty() {
            return Err(DomainError::ItemNotFound(name.to_string()));
        }
        Ok(items)
    }

    pub async fn list(&self) -> AppResult<Vec<ItemDefinition>> {
        Ok(self.repo.list().await?)
    }
}
