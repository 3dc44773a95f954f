use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub cors_origin: String,
    pub commit_max_attempts: u32,
    pub commit_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(21547),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:board.db".into()),
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:21548,http://127.0.0.1:21548".into()),
            commit_max_attempts: match std::env::var("COMMIT_MAX_ATTEMPTS") {
                Ok(v) => v.parse()?,
                Err(_) => 3,
            },
            commit_backoff_ms: match std::env::var("COMMIT_BACKOFF_MS") {
                Ok(v) => v.parse()?,
                Err(_) => 200,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 21547,
            database_url: "sqlite:board.db".into(),
            cors_origin: "http://localhost:21548,http://127.0.0.1:21548".into(),
            commit_max_attempts: 3,
            commit_backoff_ms: 200,
        }
    }
}
