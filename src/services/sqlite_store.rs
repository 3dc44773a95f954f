use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{Board, BoardError, BoardList, Card, CardPatch, NewCard};

use super::store::BoardStore;

#[derive(Debug, Clone)]
pub struct SqliteBoardStore {
    pool: SqlitePool,
}

impl SqliteBoardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_list(&self, list_id: &str) -> Result<Option<BoardList>, BoardError> {
        let list = sqlx::query_as("SELECT id, board_id, name, position FROM board_lists WHERE id = ?")
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(list)
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Card, BoardError> {
        let card: Card = sqlx::query_as("SELECT * FROM cards WHERE id = ?")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("Card not found: {}", card_id)))?;

        Ok(card)
    }
}

#[async_trait]
impl BoardStore for SqliteBoardStore {
    async fn board_for_project(&self, project_id: &str) -> Result<Option<Board>, BoardError> {
        let board = sqlx::query_as(
            "SELECT id, project_id, name FROM boards WHERE project_id = ? ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(board)
    }

    async fn lists_for_board(&self, board_id: &str) -> Result<Vec<BoardList>, BoardError> {
        let lists = sqlx::query_as(
            "SELECT id, board_id, name, position FROM board_lists WHERE board_id = ? ORDER BY position ASC, id ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lists)
    }

    async fn cards_for_list(&self, list_id: &str) -> Result<Vec<Card>, BoardError> {
        let cards = sqlx::query_as(
            "SELECT * FROM cards WHERE board_list_id = ? ORDER BY position ASC, id ASC",
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<(), BoardError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE cards SET board_list_id = COALESCE(?, board_list_id), position = COALESCE(?, position), updated_at = ? WHERE id = ?",
        )
        .bind(patch.board_list_id.as_deref())
        .bind(patch.position)
        .bind(&now)
        .bind(card_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::NotFound(format!("Card not found: {}", card_id)));
        }

        Ok(())
    }

    async fn insert_card(&self, card: &NewCard) -> Result<Card, BoardError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO cards (id, board_list_id, title, position, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&card.board_list_id)
        .bind(&card.title)
        .bind(card.position)
        .bind(&card.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_card(&id).await
    }

    async fn delete_card(&self, card_id: &str) -> Result<(), BoardError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(card_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::NotFound(format!("Card not found: {}", card_id)));
        }

        Ok(())
    }
}
