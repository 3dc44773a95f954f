use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::dto::CreateCardRequest;
use crate::api::AppState;
use crate::domain::position;
use crate::domain::{BoardError, Card, CardPatch, NewCard};
use crate::services::store::BoardStore;

pub async fn list_cards(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
) -> Result<Json<Vec<Card>>, BoardError> {
    let store = state.require_store()?;
    let cards = store.cards_for_list(&list_id).await?;
    Ok(Json(cards))
}

pub async fn create_card(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    Json(req): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), BoardError> {
    let store = state.require_store()?;

    if req.title.trim().is_empty() {
        return Err(BoardError::BadRequest("Card title must not be empty".into()));
    }
    if store.find_list(&list_id).await?.is_none() {
        return Err(BoardError::NotFound(format!("List not found: {}", list_id)));
    }

    let position = match req.position {
        Some(p) if !p.is_finite() => {
            return Err(BoardError::BadRequest("Position must be a finite number".into()));
        }
        Some(p) => p,
        None => {
            let positions: Vec<f64> = store
                .cards_for_list(&list_id)
                .await?
                .iter()
                .map(|c| c.position)
                .collect();
            position::next_position(&positions)
        }
    };

    let card = store
        .insert_card(&NewCard {
            board_list_id: list_id,
            title: req.title,
            created_by: req.created_by,
            position,
        })
        .await?;

    tracing::info!(card_id = card.id.as_str(), position, "Card created");
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CardPatch>,
) -> Result<StatusCode, BoardError> {
    let store = state.require_store()?;

    if patch.is_empty() {
        return Err(BoardError::BadRequest("Nothing to update".into()));
    }
    if patch.position.is_some_and(|p| !p.is_finite()) {
        return Err(BoardError::BadRequest("Position must be a finite number".into()));
    }
    if let Some(list_id) = &patch.board_list_id {
        if store.find_list(list_id).await?.is_none() {
            return Err(BoardError::BadRequest(format!("Unknown list: {}", list_id)));
        }
    }

    store.update_card(&id, &patch).await?;

    tracing::debug!(
        card_id = id.as_str(),
        list_id = ?patch.board_list_id,
        position = ?patch.position,
        "Card updated"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, BoardError> {
    let store = state.require_store()?;
    store.delete_card(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
