use crate::config::GameConfig;
use crate::db::error::DbError;
use crate::db::repo::CharacterRepo;
use crate::error::{AppResult, DomainError};
use crate::models::character::{Character, CharacterDraft};
use crate::models::equipment::EquipSlot;
use crate::models::inventory::{InventoryStack, ItemInstance};
use crate::models::types::{ItemId, MemberId};
use crate::services::CatalogService;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Loads, mutates and stores characters. Every mutation of one character runs under that
/// character's lock, so two commands for the same member never interleave.
pub struct CharacterService {
    repo: Arc<dyn CharacterRepo>,
    catalog: Arc<CatalogService>,
    game: Arc<GameConfig>,
    locks: DashMap<MemberId, Arc<Mutex<()>>>,
}

impl CharacterService {
    pub fn new(repo: Arc<dyn CharacterRepo>, catalog: Arc<CatalogService>, game: Arc<GameConfig>) -> Self {
        Self {
            repo,
            catalog,
            game,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, member_id: &MemberId) -> Arc<Mutex<()>> {
        self.locks.entry(member_id.clone()).or_default().clone()
    }

    async fn load(&self, member_id: &MemberId) -> AppResult<Character> {
        self.repo
            .get(member_id)
            .await?
            .ok_or_else(|| DomainError::CharacterNotFound(member_id.clone()))
    }

    /// Runs `f` on the stored character and saves the result. Nothing is saved when `f` fails
    /// or the result breaks an invariant.
    async fn mutate<T, F>(&self, member_id: &MemberId, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Character) -> AppResult<T>,
    {
        let lock = self.lock_for(member_id);
        let _guard = lock.lock().await;

        let mut character = self.load(member_id).await?;
        let out = f(&mut character)?;

        if let Err(e) = character.verify() {
            tracing::error!(member = %member_id, error = %e, "refusing to save inconsistent character");
            return Err(e);
        }
        self.repo.save(&character).await?;
        Ok(out)
    }

    pub async fn create(&self, draft: CharacterDraft) -> AppResult<Character> {
        let member_id = draft.member_id.clone();
        let lock = self.lock_for(&member_id);
        let _guard = lock.lock().await;

        if self.repo.exists(&member_id).await? {
            return Err(DomainError::CharacterAlreadyExists(member_id));
        }

        let character = Character::new(draft, &self.game)?;
        match self.repo.insert(&character).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation) => return Err(DomainError::CharacterAlreadyExists(member_id)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(member = %member_id, name = %character.name, race = %character.race, "created character");
        Ok(character)
    }

    pub async fn get(&self, member_id: &MemberId) -> AppResult<Character> {
        self.load(member_id).await
    }

    pub async fn exists(&self, member_id: &MemberId) -> AppResult<bool> {
        Ok(self.repo.exists(member_id).await?)
    }

    pub async fn delete(&self, member_id: &MemberId) -> AppResult<()> {
        // The lock entry outlives the character: tasks still queued on it and a character
        // created later for the same member must share one mutex.
        let lock = self.lock_for(member_id);
        let _guard = lock.lock().await;

        let deleted = self.repo.delete(member_id).await?;
        if !deleted {
            return Err(DomainError::CharacterNotFound(member_id.clone()));
        }
        tracing::info!(member = %member_id, "deleted character");
        Ok(())
    }

    pub async fn list_members(&self) -> AppResult<Vec<MemberId>> {
        Ok(self.repo.list_members().await?)
    }

    pub async fn add_item(
        &self,
        member_id: &MemberId,
        item_id: ItemId,
        count: u32,
        maker: Option<String>,
        temper: Option<u32>,
    ) -> AppResult<()> {
        let item = self.catalog.get_by_id(item_id).await?;
        self.mutate(member_id, |c| c.add_item(&item, count, maker, temper)).await?;
        tracing::debug!(member = %member_id, item_id = %item_id, count, "added item");
        Ok(())
    }

    pub async fn remove_item(
        &self,
        member_id: &MemberId,
        item_id: ItemId,
        count: u32,
        maker: Option<String>,
        temper: Option<u32>,
    ) -> AppResult<()> {
        let item = self.catalog.get_by_id(item_id).await?;
        self.mutate(member_id, |c| c.remove_item(&item, count, maker, temper)).await?;
        tracing::debug!(member = %member_id, item_id = %item_id, count, "removed item");
        Ok(())
    }

    /// Every stack of the item the character holds, whatever its maker and temper.
    pub async fn find_stacks(&self, member_id: &MemberId, item_id: ItemId) -> AppResult<Vec<InventoryStack>> {
        let item = self.catalog.get_by_id(item_id).await?;
        let character = self.load(member_id).await?;
        let stacks = character.find_stacks(&item)?;
        Ok(stacks.into_iter().cloned().collect())
    }

    pub async fn equip(
        &self,
        member_id: &MemberId,
        item_id: ItemId,
        maker: Option<String>,
        temper: Option<u32>,
    ) -> AppResult<()> {
        let item = self.catalog.get_by_id(item_id).await?;
        let instance = ItemInstance::new(item, maker, temper);
        self.mutate(member_id, |c| c.equip(&instance)).await?;
        tracing::debug!(member = %member_id, item_id = %item_id, "equipped item");
        Ok(())
    }

    /// Unequips the first slot holding the item and returns that slot.
    pub async fn unequip_item(&self, member_id: &MemberId, item_id: ItemId) -> AppResult<EquipSlot> {
        let slot = self.mutate(member_id, |c| c.unequip_item(item_id)).await?;
        tracing::debug!(member = %member_id, item_id = %item_id, slot = %slot, "unequipped item");
        Ok(slot)
    }

    /// Empties a slot. Returns what it held, or `None` when it was already empty.
    pub async fn unequip_slot(&self, member_id: &MemberId, slot: EquipSlot) -> AppResult<Option<ItemInstance>> {
        self.mutate(member_id, |c| c.unequip_slot(slot)).await
    }

    /// Sets or clears the avatar url.
    pub async fn set_avatar(&self, member_id: &MemberId, url: Option<String>) -> AppResult<()> {
        self.mutate(member_id, |c| c.set_avatar(url)).await
    }

    /// Regenerates the pools of every stored character. Failures are logged per character and
    /// do not stop the sweep. Returns how many characters were updated.
    pub async fn regenerate_all(&self, elapsed: Duration) -> AppResult<usize> {
        let members = self.repo.list_members().await?;

        let mut updated = 0;
        for member_id in &members {
            match self
                .mutate(member_id, |c| {
                    c.regenerate(elapsed);
                    Ok(())
                })
                .await
            {
                Ok(()) => updated += 1,
                // deleted between listing and loading
                Err(DomainError::CharacterNotFound(_)) => {}
                Err(e) => tracing::warn!(member = %member_id, error = %e, "regeneration failed"),
            }
        }

        tracing::trace!(updated, total = members.len(), "regeneration tick");
        Ok(updated)
    }
}
