use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

/// Commits from several clients hit the same rows one write at a time; a
/// short busy timeout lets them queue instead of failing with SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the board database, applies migrations and reports the journal mode
/// it ended up in. Cards reference lists, so foreign keys are enforced.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let mode = journal_mode(&pool).await?;
    tracing::info!(database_url, journal_mode = mode.as_str(), "Board database ready");

    Ok(pool)
}

/// In-memory databases report `memory`; files opened by `init_db` report `wal`.
pub async fn journal_mode(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let row = sqlx::query("PRAGMA journal_mode").fetch_one(pool).await?;
    Ok(row.get::<String, _>(0))
}
