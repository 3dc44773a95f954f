use async_trait::async_trait;

use crate::domain::{Board, BoardError, BoardList, Card, CardPatch, NewCard};

/// Durable store consumed by the synchronizer. Reads come back ordered by
/// position ascending; writes touch exactly one row.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn board_for_project(&self, project_id: &str) -> Result<Option<Board>, BoardError>;

    async fn lists_for_board(&self, board_id: &str) -> Result<Vec<BoardList>, BoardError>;

    async fn cards_for_list(&self, list_id: &str) -> Result<Vec<Card>, BoardError>;

    async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<(), BoardError>;

    async fn insert_card(&self, card: &NewCard) -> Result<Card, BoardError>;

    async fn delete_card(&self, card_id: &str) -> Result<(), BoardError>;
}
