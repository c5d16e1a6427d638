use crate::db::error::DbError;
use crate::db::repo::CharacterRepo;
use crate::db::{Db, DbResult, map_row_opt};
use crate::models::character::Character;
use crate::models::types::MemberId;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::Json;

pub struct CharacterRepository {
    db: Arc<Db>,
}

impl CharacterRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    fn row_to_character(row: &Row) -> DbResult<Character> {
        let Json(character): Json<Character> = row
            .try_get("doc")
            .map_err(|e| DbError::Decode(format!("character document: {e}")))?;
        Ok(character)
    }
}

#[async_trait::async_trait]
impl CharacterRepo for CharacterRepository {
    async fn get(&self, member_id: &MemberId) -> DbResult<Option<Character>> {
        let client = self.db.get_client().await?;
        let stmt = client
            .prepare_cached("SELECT doc FROM characters WHERE member_id = $1")
            .await?;
        let row = client.query_opt(&stmt, &[member_id]).await?;

        map_row_opt(row, Self::row_to_character, "character get")
    }

    async fn exists(&self, member_id: &MemberId) -> DbResult<bool> {
        let client = self.db.get_client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM characters WHERE member_id = $1)",
                &[member_id],
            )
            .await?;

        Ok(row.get(0))
    }

    async fn insert(&self, character: &Character) -> DbResult<()> {
        let client = self.db.get_client().await?;

        client
            .execute(
                r#"
                INSERT INTO characters (member_id, id, name, doc, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
                &[
                    &character.member_id,
                    &character.id,
                    &character.name,
                    &Json(character),
                    &character.created_at,
                ],
            )
            .await
            .map_err(DbError::from_write)?;

        Ok(())
    }

    async fn save(&self, character: &Character) -> DbResult<()> {
        let client = self.db.get_client().await?;

        let n = client
            .execute(
                r#"
                UPDATE characters
                SET name = $2, doc = $3, updated_at = now()
                WHERE member_id = $1
                "#,
                &[&character.member_id, &character.name, &Json(character)],
            )
            .await?;

        if n == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, member_id: &MemberId) -> DbResult<bool> {
        let client = self.db.get_client().await?;
        let n = client
            .execute("DELETE FROM characters WHERE member_id = $1", &[member_id])
            .await?;

        Ok(n > 0)
    }

    async fn list_members(&self) -> DbResult<Vec<MemberId>> {
        let client = self.db.get_client().await?;
        let rows = client
            .query("SELECT member_id FROM characters ORDER BY member_id", &[])
            .await?;

        Ok(rows.iter().map(|r| r.get::<_, MemberId>(0)).collect())
    }
}
