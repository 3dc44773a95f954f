use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::domain::{Board, BoardError, BoardList, Card, CardPatch, NewCard};

use super::store::BoardStore;

/// Talks to a remote board service over its JSON API.
#[derive(Debug, Clone)]
pub struct HttpBoardStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBoardStore {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turns the statuses the board API uses for rejected requests back into the
/// matching `BoardError`, so callers do not retry them. Anything else non-2xx
/// stays an HTTP error.
async fn check_write(
    response: reqwest::Response,
    what: &str,
    id: &str,
) -> Result<reqwest::Response, BoardError> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(BoardError::NotFound(format!("{} not found: {}", what, id))),
        StatusCode::BAD_REQUEST => {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("{} rejected: {}", what, id));
            Err(BoardError::BadRequest(message))
        }
        _ => Ok(response.error_for_status()?),
    }
}

#[async_trait]
impl BoardStore for HttpBoardStore {
    async fn board_for_project(&self, project_id: &str) -> Result<Option<Board>, BoardError> {
        let response = self
            .http_client
            .get(self.url(&format!("/api/projects/{}/board", project_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn lists_for_board(&self, board_id: &str) -> Result<Vec<BoardList>, BoardError> {
        let lists = self
            .http_client
            .get(self.url(&format!("/api/boards/{}/lists", board_id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(lists)
    }

    async fn cards_for_list(&self, list_id: &str) -> Result<Vec<Card>, BoardError> {
        let cards = self
            .http_client
            .get(self.url(&format!("/api/lists/{}/cards", list_id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(cards)
    }

    async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<(), BoardError> {
        let response = self
            .http_client
            .patch(self.url(&format!("/api/cards/{}", card_id)))
            .json(patch)
            .send()
            .await?;

        check_write(response, "Card", card_id).await?;
        Ok(())
    }

    async fn insert_card(&self, card: &NewCard) -> Result<Card, BoardError> {
        let response = self
            .http_client
            .post(self.url(&format!("/api/lists/{}/cards", card.board_list_id)))
            .json(&json!({
                "title": &card.title,
                "created_by": &card.created_by,
                "position": card.position,
            }))
            .send()
            .await?;

        Ok(check_write(response, "List", &card.board_list_id)
            .await?
            .json()
            .await?)
    }

    async fn delete_card(&self, card_id: &str) -> Result<(), BoardError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/api/cards/{}", card_id)))
            .send()
            .await?;

        check_write(response, "Card", card_id).await?;
        Ok(())
    }
}
