use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::domain::BoardError;
use crate::services::SqliteBoardStore;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Option<SqlitePool>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Option<SqlitePool>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    pub fn require_db(&self) -> Result<&SqlitePool, BoardError> {
        self.db
            .as_ref()
            .ok_or_else(|| BoardError::Internal("Database not available".into()))
    }

    pub fn require_store(&self) -> Result<SqliteBoardStore, BoardError> {
        self.require_db().map(|pool| SqliteBoardStore::new(pool.clone()))
    }
}
