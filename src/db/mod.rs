//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all site content.

mod bootstrap;
mod legacy;
mod store;

pub use bootstrap::*;
pub use legacy::*;
pub use store::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes if they don't exist.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now')),
            initialized INTEGER NOT NULL DEFAULT 0
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at, initialized)
        VALUES (1, 1, 0, datetime('now'), 0);
        "#,
    )
    .execute(pool)
    .await?;

    // Roster is an embedded JSON list, only set for classes.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            position INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            editable_date TEXT,
            last_updated TEXT NOT NULL,
            filename TEXT,
            active INTEGER,
            roster TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alert (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            color TEXT NOT NULL,
            orientation TEXT NOT NULL,
            active INTEGER NOT NULL,
            enable_title INTEGER NOT NULL,
            enable_content INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_items_collection_position ON items(collection, position);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
