use crate::db::DbResult;
use crate::db::error::DbError;
use crate::db::repo::CharacterRepo;
use crate::models::character::Character;
use crate::models::types::MemberId;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Default)]
pub struct MemoryCharacterRepository {
    characters: DashMap<MemberId, Character>,
}

impl MemoryCharacterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CharacterRepo for MemoryCharacterRepository {
    async fn get(&self, member_id: &MemberId) -> DbResult<Option<Character>> {
        Ok(self.characters.get(member_id).map(|r| r.value().clone()))
    }

    async fn exists(&self, member_id: &MemberId) -> DbResult<bool> {
        Ok(self.characters.contains_key(member_id))
    }

    async fn insert(&self, character: &Character) -> DbResult<()> {
        match self.characters.entry(character.member_id.clone()) {
            Entry::Occupied(_) => Err(DbError::UniqueViolation),
            Entry::Vacant(v) => {
                v.insert(character.clone());
                Ok(())
            }
        }
    }

    async fn save(&self, character: &Character) -> DbResult<()> {
        match self.characters.get_mut(&character.member_id) {
            Some(mut slot) => {
                *slot = character.clone();
                Ok(())
            }
            None => Err(DbError::NotFound),
        }
    }

    async fn delete(&self, member_id: &MemberId) -> DbResult<bool> {
        Ok(self.characters.remove(member_id).is_some())
    }

    async fn list_members(&self) -> DbResult<Vec<MemberId>> {
        let mut members: Vec<MemberId> = self.characters.iter().map(|r| r.key().clone()).collect();
        members.sort();
        Ok(members)
    }
}
