use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Board {
    pub id: String,
    pub project_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BoardList {
    pub id: String,
    pub board_id: String,
    pub name: String,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: String,
    pub board_list_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<String>,
    pub position: f64,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update applied by a move. Only these two columns are ever written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.board_list_id.is_none() && self.position.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub board_list_id: String,
    pub title: String,
    pub created_by: String,
    pub position: f64,
}
