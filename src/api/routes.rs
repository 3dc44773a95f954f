use axum::http::HeaderValue;
use axum::routing::{get, patch};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::state::AppState;
use crate::config::Config;

pub fn create_router(state: AppState, config: &Config) -> Router {
    let origins: Vec<HeaderValue> = config
        .cors_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let board_routes = Router::new()
        .route("/{id}", get(handlers::boards::get_board))
        .route("/{id}/lists", get(handlers::boards::list_board_lists));

    let list_routes = Router::new().route(
        "/{id}/cards",
        get(handlers::cards::list_cards).post(handlers::cards::create_card),
    );

    let card_routes = Router::new().route(
        "/{id}",
        patch(handlers::cards::update_card).delete(handlers::cards::delete_card),
    );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness))
        .route(
            "/api/projects/{id}/board",
            get(handlers::boards::get_project_board),
        )
        .nest("/api/boards", board_routes)
        .nest("/api/lists", list_routes)
        .nest("/api/cards", card_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
