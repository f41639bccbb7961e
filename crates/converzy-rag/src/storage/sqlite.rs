//! SQLite turn log and profile store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::{ChatStore, ProfileStore};
use crate::types::{Role, Turn, TurnCounts};

/// SQLite-backed chat store
#[derive(Clone)]
pub struct SqliteChatStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChatStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            -- Conversation log, append-only
            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('human', 'ai')),
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns(user_id, document_id, id);

            -- User profiles
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                has_active_membership INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to run migrations: {}", e)))?;

        Ok(())
    }

    fn insert_turn(&self, user_id: &str, document_id: &str, turn: &Turn) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO turns (user_id, document_id, role, message, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                document_id,
                turn.role.as_str(),
                turn.message,
                turn.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn select_turns(&self, user_id: &str, document_id: &str) -> Result<Vec<Turn>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT role, message, created_at FROM turns WHERE user_id = ?1 AND document_id = ?2 ORDER BY id ASC",
        )?;

        let turns = stmt
            .query_map(params![user_id, document_id], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    fn select_recent_turns(&self, user_id: &str, document_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT role, message, created_at FROM (
                SELECT id, role, message, created_at FROM turns
                WHERE user_id = ?1 AND document_id = ?2
                ORDER BY id DESC LIMIT ?3
            ) ORDER BY id ASC",
        )?;

        let turns = stmt
            .query_map(params![user_id, document_id, limit as i64], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    fn select_counts(&self, user_id: &str, document_id: &str) -> Result<TurnCounts> {
        let conn = self.conn.lock();
        let (human, ai): (i64, i64) = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN role = 'human' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN role = 'ai' THEN 1 ELSE 0 END), 0)
             FROM turns WHERE user_id = ?1 AND document_id = ?2",
            params![user_id, document_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(TurnCounts {
            human: human as usize,
            ai: ai as usize,
        })
    }

    fn select_membership(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let active: Option<bool> = conn
            .query_row(
                "SELECT has_active_membership FROM users WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(active.unwrap_or(false))
    }

    fn upsert_membership(&self, user_id: &str, active: bool) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (user_id, has_active_membership, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                has_active_membership = excluded.has_active_membership,
                updated_at = excluded.updated_at",
            params![user_id, active, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn row_to_turn(row: &rusqlite::Row) -> rusqlite::Result<Turn> {
    let role_str: String = row.get(0)?;
    let message: String = row.get(1)?;
    let created_at_str: String = row.get(2)?;

    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown role: {}", role_str).into(),
        )
    })?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Turn {
        role,
        message,
        created_at,
    })
}

/// Run a blocking store call off the async runtime
async fn blocking<T, F>(store: &SqliteChatStore, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&SqliteChatStore) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn append_turn(&self, user_id: &str, document_id: &str, turn: &Turn) -> Result<()> {
        let (user_id, document_id, turn) = (user_id.to_string(), document_id.to_string(), turn.clone());
        blocking(self, move |store| store.insert_turn(&user_id, &document_id, &turn)).await
    }

    async fn list_turns(&self, user_id: &str, document_id: &str) -> Result<Vec<Turn>> {
        let (user_id, document_id) = (user_id.to_string(), document_id.to_string());
        blocking(self, move |store| store.select_turns(&user_id, &document_id)).await
    }

    async fn recent_turns(&self, user_id: &str, document_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let (user_id, document_id) = (user_id.to_string(), document_id.to_string());
        blocking(self, move |store| store.select_recent_turns(&user_id, &document_id, limit)).await
    }

    async fn count_turns(&self, user_id: &str, document_id: &str) -> Result<TurnCounts> {
        let (user_id, document_id) = (user_id.to_string(), document_id.to_string());
        blocking(self, move |store| store.select_counts(&user_id, &document_id)).await
    }
}

#[async_trait]
impl ProfileStore for SqliteChatStore {
    async fn has_active_membership(&self, user_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        blocking(self, move |store| store.select_membership(&user_id)).await
    }

    async fn set_membership(&self, user_id: &str, active: bool) -> Result<()> {
        let user_id = user_id.to_string();
        blocking(self, move |store| store.upsert_membership(&user_id, active)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_turns_are_returned_in_append_order() {
        let store = SqliteChatStore::in_memory().unwrap();

        store.append_turn("u1", "doc-1", &Turn::human("q1")).await.unwrap();
        store.append_turn("u1", "doc-1", &Turn::ai("a1")).await.unwrap();
        store.append_turn("u1", "doc-1", &Turn::human("q2")).await.unwrap();

        let turns = store.list_turns("u1", "doc-1").await.unwrap();
        let messages: Vec<&str> = turns.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["q1", "a1", "q2"]);
        assert_eq!(turns[1].role, Role::Ai);
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let store = SqliteChatStore::in_memory().unwrap();

        store.append_turn("u1", "doc-1", &Turn::human("mine")).await.unwrap();
        store.append_turn("u2", "doc-1", &Turn::human("theirs")).await.unwrap();
        store.append_turn("u1", "doc-2", &Turn::human("other doc")).await.unwrap();

        let turns = store.list_turns("u1", "doc-1").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].message, "mine");
    }

    #[tokio::test]
    async fn test_count_turns() {
        let store = SqliteChatStore::in_memory().unwrap();
        assert_eq!(store.count_turns("u1", "doc-1").await.unwrap(), TurnCounts::default());

        store.append_turn("u1", "doc-1", &Turn::human("q1")).await.unwrap();
        store.append_turn("u1", "doc-1", &Turn::ai("a1")).await.unwrap();
        store.append_turn("u1", "doc-1", &Turn::human("q2")).await.unwrap();

        let counts = store.count_turns("u1", "doc-1").await.unwrap();
        assert_eq!(counts, TurnCounts { human: 2, ai: 1 });
    }

    #[tokio::test]
    async fn test_recent_turns_keeps_tail_in_order() {
        let store = SqliteChatStore::in_memory().unwrap();
        for i in 0..5 {
            store.append_turn("u1", "doc-1", &Turn::human(format!("q{}", i))).await.unwrap();
        }

        let recent = store.recent_turns("u1", "doc-1", 2).await.unwrap();
        let messages: Vec<&str> = recent.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["q3", "q4"]);
        assert!(store.recent_turns("u1", "doc-1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_membership_defaults_to_free() {
        let store = SqliteChatStore::in_memory().unwrap();
        assert!(!store.has_active_membership("u1").await.unwrap());

        store.set_membership("u1", true).await.unwrap();
        assert!(store.has_active_membership("u1").await.unwrap());

        store.set_membership("u1", false).await.unwrap();
        assert!(!store.has_active_membership("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_on_disk_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");

        {
            let store = SqliteChatStore::new(&path).unwrap();
            store.append_turn("u1", "doc-1", &Turn::human("persisted")).await.unwrap();
            store.set_membership("u1", true).await.unwrap();
        }

        let store = SqliteChatStore::new(&path).unwrap();
        let turns = store.list_turns("u1", "doc-1").await.unwrap();
        assert_eq!(turns[0].message, "persisted");
        assert!(store.has_active_membership("u1").await.unwrap());
    }
}
