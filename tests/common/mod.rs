#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tower::ServiceExt;

use project_board::api::{create_router, AppState};
use project_board::config::Config;

pub const PROJECT_ID: &str = "proj-1";
pub const BOARD_ID: &str = "board-1";

/// Fresh in-memory database with one project, one board and three lists:
/// `todo`, `doing`, `done`.
pub async fn setup_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, created_at) VALUES ('proj-1', 'Zine', '2026-01-01T00:00:00Z');
        INSERT INTO boards (id, project_id, name, created_at) VALUES ('board-1', 'proj-1', 'Main', '2026-01-01T00:00:00Z');
        INSERT INTO board_lists (id, board_id, name, position) VALUES
            ('done', 'board-1', 'Done', 3000),
            ('todo', 'board-1', 'To do', 1000),
            ('doing', 'board-1', 'Doing', 2000);
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to seed test data");

    pool
}

pub async fn seed_cards(pool: &SqlitePool, list_id: &str, cards: &[(&str, f64)]) {
    for (id, position) in cards {
        sqlx::query(
            "INSERT INTO cards (id, board_list_id, title, position, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, 'seed', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(list_id)
        .bind(format!("Card {}", id))
        .bind(position)
        .execute(pool)
        .await
        .expect("Failed to seed card");
    }
}

/// Stored (id, position) pairs for a list, in stored order.
pub async fn stored_order(pool: &SqlitePool, list_id: &str) -> Vec<(String, f64)> {
    sqlx::query_as("SELECT id, position FROM cards WHERE board_list_id = ? ORDER BY position ASC, id ASC")
        .bind(list_id)
        .fetch_all(pool)
        .await
        .expect("Failed to read cards")
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        commit_max_attempts: 3,
        commit_backoff_ms: 1,
    })
}

pub fn test_app(pool: SqlitePool) -> Router {
    let config = test_config();
    let state = AppState::new(Some(pool), config.clone());
    create_router(state, &config)
}

pub async fn make_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, String) {
    let mut request = Request::builder().uri(uri).method(method);

    if body.is_some() {
        request = request.header("content-type", "application/json");
    }

    let request = request
        .body(Body::from(body.unwrap_or_default()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();

    (status, body_str)
}
