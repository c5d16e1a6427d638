use crate::db::DbResult;
use crate::models::character::Character;
use crate::models::types::MemberId;

/// Characters are stored as whole documents keyed by the owning member.
#[async_trait::async_trait]
pub trait CharacterRepo: Send + Sync {
    async fn get(&self, member_id: &MemberId) -> DbResult<Option<Character>>;
    async fn exists(&self, member_id: &MemberId) -> DbResult<bool>;
    /// Stores a new character. Fails with `UniqueViolation` when the member already has one.
    async fn insert(&self, character: &Character) -> DbResult<()>;
    /// Overwrites the stored document of an existing character.
    async fn save(&self, character: &Character) -> DbResult<()>;
    /// Returns false when there was nothing to delete
    async fn delete(&self, member_id: &MemberId) -> DbResult<bool>;
    async fn list_members(&self) -> DbResult<Vec<MemberId>>;
}
