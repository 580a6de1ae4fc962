//! SQLite connection and schema for the knowledge base.
//!
//! The knowledge base is a derived index over the hierarchy store, not
//! a source of truth: every row can be rebuilt from the per-subject
//! JSON documents. Schema creation is idempotent.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the knowledge-base tables and indexes.
///
/// `topics` mirrors every topic across all subjects, keyed by
/// `(subject, id)`. The `module_order`/`topic_order` columns preserve
/// the hierarchy's pedagogical sequencing so queries never fall back to
/// alphabetical order. `data` holds the full topic JSON.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS topics (
            subject TEXT NOT NULL,
            id TEXT NOT NULL,
            module_id TEXT NOT NULL,
            module_name TEXT NOT NULL,
            module_order INTEGER NOT NULL,
            topic_order INTEGER NOT NULL,
            name TEXT NOT NULL,
            summary TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (subject, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            topic TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            qtype TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_topics_subject ON topics(subject)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_topics_module_name ON topics(module_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions(subject)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_topic ON questions(topic)")
        .execute(pool)
        .await?;

    Ok(())
}

/// `stu init`: create the database file and schema.
pub async fn run_init(config: &Config) -> Result<()> {
    std::fs::create_dir_all(config.store.data_dir.join("subjects"))?;
    let pool = connect(config).await?;
    run_migrations(&pool).await?;
    pool.close().await;
    println!("Knowledge base initialized at {}", config.db.path.display());
    println!(
        "Subjects folder created at {}",
        config.store.data_dir.join("subjects").display()
    );
    Ok(())
}
