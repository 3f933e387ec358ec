use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};

/// Opens the relational store. Concurrent writers are serialized by SQLite's
/// WAL mode; a writer waits up to the busy timeout before failing.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse database url {}", database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .context("connect to database")?;
    Ok(pool)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Fresh in-memory store with the schema applied.
#[cfg(test)]
pub async fn memory() -> SqlitePool {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory url")
        .foreign_keys(true);
    // One connection: every pooled connection would otherwise see its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("open memory db");
    migrate(&pool).await.expect("migrate memory db");
    pool
}

/// Inserts a user with a fixed id so tests can speak about "user 7".
#[cfg(test)]
pub async fn seed_user(db: &SqlitePool, id: i64, email: &str) {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, 'x', ?)",
    )
    .bind(id)
    .bind(email)
    .bind(time::OffsetDateTime::now_utc())
    .execute(db)
    .await
    .expect("seed user");
}
