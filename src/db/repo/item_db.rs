use crate::db::error::DbError;
use crate::db::repo::ItemRepo;
use crate::db::{Db, DbResult, map_row_opt};
use crate::models::item::ItemDefinition;
use crate::models::types::ItemId;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::Json;

pub struct ItemRepository {
    db: Arc<Db>,
}

impl ItemRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    fn row_to_item(row: &Row) -> DbResult<ItemDefinition> {
        let Json(item): Json<ItemDefinition> = row
            .try_get("doc")
            .map_err(|e| DbError::Decode(format!("item document: {e}")))?;
        Ok(item)
    }
}

#[async_trait::async_trait]
impl ItemRepo for ItemRepository {
    async fn insert(&self, item: &ItemDefinition) -> DbResult<()> {
        let client = self.db.get_client().await?;

        client
            .execute(
                r#"
                INSERT INTO items (id, name, category, doc)
                VALUES ($1, $2, $3, $4)
                "#,
                &[&item.id, &item.name, &item.category().as_str(), &Json(item)],
            )
            .await
            .map_err(DbError::from_write)?;

        Ok(())
    }

    async fn get_by_id(&self, id: ItemId) -> DbResult<Option<ItemDefinition>> {
        let client = self.db.get_client().await?;
        let stmt = client.prepare_cached("SELECT doc FROM items WHERE id = $1").await?;
        let row = client.query_opt(&stmt, &[&id]).await?;

        map_row_opt(row, Self::row_to_item, "item get_by_id")
    }

    async fn find_by_name(&self, name: &str) -> DbResult<Vec<ItemDefinition>> {
        let client = self.db.get_client().await?;
        let stmt = client
            .prepare_cached("SELECT doc FROM items WHERE lower(name) = lower($1) ORDER BY id")
            .await?;
        let rows = client.query(&stmt, &[&name.trim()]).await?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn max_id(&self) -> DbResult<Option<ItemId>> {
        let client = self.db.get_client().await?;
        let row = client.query_one("SELECT max(id) FROM items", &[]).await?;

        Ok(row.get::<_, Option<ItemId>>(0))
    }

    async fn list(&self) -> DbResult<Vec<ItemDefinition>> {
        let client = self.db.get_client().await?;
        let rows = client.query("SELECT doc FROM items ORDER BY id", &[]).await?;

        rows.iter().map(Self::row_to_item).collect()
    }
}
