//! Durable assessment store on SQLite
//!
//! Every operation opens its own connection on the blocking pool and runs in
//! one transaction, so a failed write leaves nothing behind. Issue and
//! regulation lists are stored as JSON arrays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use complyscan_core::{Error, Result, StoredResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

use crate::store::ResultStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS assessments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input_text TEXT NOT NULL UNIQUE,
    identified_issues TEXT NOT NULL,
    relevant_regulations TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// One persisted analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub id: i64,
    pub input_text: String,
    pub identified_issues: Vec<String>,
    pub relevant_regulations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    pub fn to_stored(&self) -> StoredResult {
        StoredResult::new(
            self.identified_issues.clone(),
            self.relevant_regulations.clone(),
        )
    }
}

/// Resolve a database URL to a file path
///
/// Accepts `sqlite://<path>`, `sqlite:<path>` or a bare path. In-memory
/// databases are rejected since each operation uses a fresh connection.
pub fn parse_database_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    if path.is_empty() {
        return Err(Error::config("database url has no path"));
    }
    if path == ":memory:" {
        return Err(Error::config(
            "in-memory sqlite is not supported, leave DATABASE_URL unset for the memory backend",
        ));
    }
    if path.contains("://") {
        return Err(Error::config(format!(
            "unsupported database url scheme: {}",
            url
        )));
    }

    Ok(PathBuf::from(path))
}

/// SQLite-backed assessment store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database and its schema
    pub async fn open(database_url: &str) -> Result<Self> {
        let path = parse_database_url(database_url)?;
        let path_clone = path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path_clone)?;
            conn.execute_batch(SCHEMA).map_err(db_error)?;
            Ok::<_, Error>(())
        })
        .await
        .map_err(join_error)??;

        tracing::info!("Opened assessment store at {}", path.display());
        Ok(Self { db_path: path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Insert an assessment; returns false when `input_text` already exists
    pub async fn add(&self, input_text: &str, issues: &[String], laws: &[String]) -> Result<bool> {
        let path = self.db_path.clone();
        let input = input_text.to_string();
        let issues_json = serde_json::to_string(issues)?;
        let laws_json = serde_json::to_string(laws)?;

        task::spawn_blocking(move || -> Result<bool> {
            let mut conn = connect(&path)?;
            let tx = conn.transaction().map_err(db_error)?;
            let now = Utc::now().to_rfc3339();

            let inserted = tx
                .execute(
                    "INSERT INTO assessments (input_text, identified_issues, relevant_regulations, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(input_text) DO NOTHING",
                    params![&input, &issues_json, &laws_json, &now],
                )
                .map_err(db_error)?;

            tx.commit().map_err(db_error)?;
            Ok(inserted > 0)
        })
        .await
        .map_err(join_error)?
    }

    /// First assessment recorded for `input_text`
    pub async fn get_by_input(&self, input_text: &str) -> Result<Option<Assessment>> {
        let path = self.db_path.clone();
        let input = input_text.to_string();

        task::spawn_blocking(move || -> Result<Option<Assessment>> {
            let mut conn = connect(&path)?;
            let tx = conn.transaction().map_err(db_error)?;

            let row: Option<(i64, String, String, String, String)> = tx
                .query_row(
                    "SELECT id, input_text, identified_issues, relevant_regulations, created_at
                     FROM assessments
                     WHERE input_text = ?1
                     ORDER BY id ASC
                     LIMIT 1",
                    params![&input],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )
                .optional()
                .map_err(db_error)?;

            tx.commit().map_err(db_error)?;

            row.map(|(id, input_text, issues, laws, created_at)| -> Result<Assessment> {
                Ok(Assessment {
                    id,
                    input_text,
                    identified_issues: serde_json::from_str(&issues)?,
                    relevant_regulations: serde_json::from_str(&laws)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| Error::store(format!("invalid created_at: {}", e)))?
                        .with_timezone(&Utc),
                })
            })
            .transpose()
        })
        .await
        .map_err(join_error)?
    }

    /// Number of stored assessments
    pub async fn count(&self) -> Result<i64> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<i64> {
            let conn = connect(&path)?;
            conn.query_row("SELECT COUNT(*) FROM assessments", [], |row| row.get(0))
                .map_err(db_error)
        })
        .await
        .map_err(join_error)?
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn lookup(&self, key: &str) -> Result<Option<StoredResult>> {
        Ok(self.get_by_input(key).await?.map(|a| a.to_stored()))
    }

    async fn record(&self, key: &str, result: &StoredResult) -> Result<()> {
        if !self.add(key, &result.issues, &result.regulations).await? {
            tracing::debug!(
                "Assessment {} already stored",
                complyscan_core::fingerprint(key)
            );
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(db_error)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(db_error)?;
    Ok(conn)
}

fn db_error(e: rusqlite::Error) -> Error {
    Error::store(format!("sqlite: {}", e))
}

fn join_error(e: task::JoinError) -> Error {
    Error::internal(format!("blocking task failed: {}", e))
}
