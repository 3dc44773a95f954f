use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            BoardError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            BoardError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            BoardError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            BoardError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
            BoardError::Http(err) => {
                tracing::error!("Upstream HTTP error: {:?}", err);
                (StatusCode::BAD_GATEWAY, "Upstream request failed".into())
            }
            BoardError::Serialization(err) => {
                tracing::error!("Serialization error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Rejected gesture transitions. These never touch the durable store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GestureError {
    #[error("card not on board: {0}")]
    UnknownCard(String),

    #[error("a drag is already in progress for card {0}")]
    AlreadyDragging(String),

    #[error("no drag in progress")]
    NotDragging,
}
