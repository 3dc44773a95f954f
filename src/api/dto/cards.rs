use serde::{Deserialize, Serialize};

use crate::domain::{BoardList, Card};

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub created_by: String,
    /// Appended after the last card when omitted.
    #[serde(default)]
    pub position: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct BoardSnapshot {
    pub board_id: String,
    pub lists: Vec<ListWithCards>,
}

#[derive(Debug, Serialize)]
pub struct ListWithCards {
    #[serde(flatten)]
    pub list: BoardList,
    pub cards: Vec<Card>,
}
