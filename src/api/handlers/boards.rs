use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::dto::{BoardSnapshot, ListWithCards};
use crate::api::AppState;
use crate::domain::{Board, BoardError, BoardList};
use crate::services::store::BoardStore;
use crate::services::sync::load_board;

pub async fn get_project_board(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Board>, BoardError> {
    let store = state.require_store()?;
    let board = store
        .board_for_project(&project_id)
        .await?
        .ok_or_else(|| BoardError::NotFound(format!("No board for project: {}", project_id)))?;
    Ok(Json(board))
}

/// Whole board in one response. An unknown board is an empty board.
pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> Result<Json<BoardSnapshot>, BoardError> {
    let store = state.require_store()?;
    let mut loaded = load_board(&store, &board_id).await;

    let lists = loaded
        .lists
        .into_iter()
        .map(|list| {
            let cards = loaded.cards_by_list.remove(&list.id).unwrap_or_default();
            ListWithCards { list, cards }
        })
        .collect();

    Ok(Json(BoardSnapshot { board_id, lists }))
}

pub async fn list_board_lists(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> Result<Json<Vec<BoardList>>, BoardError> {
    let store = state.require_store()?;
    let lists = store.lists_for_board(&board_id).await?;
    Ok(Json(lists))
}
