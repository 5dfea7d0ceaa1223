use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Map, Value};
use tokio::task;

use super::error::{StoreError, StoreResult};
use super::traits::DocumentStore;
use crate::models::{Conversation, Message, NewConversation, NewMessage, Role};

/// Upper bound on ids bound into a single `IN (...)` clause.
const DELETE_CHUNK: usize = 500;

/// SQLite-backed document store for conversations and messages.
///
/// The two collections are deliberately not linked by a foreign key: orphan
/// cleanup and cascading deletes are the conversation store's job.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        tracing::debug!("Opened database at {}", path.display());

        Ok(db)
    }

    /// Create an in-memory database (used for testing)
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE conversations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    model TEXT NOT NULL,
                    pinned INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    extra TEXT NOT NULL DEFAULT '{}'
                );

                CREATE TABLE messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    conversation_id INTEGER NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    extra TEXT NOT NULL DEFAULT '{}'
                );

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        if version < 2 {
            conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);

                 UPDATE schema_version SET version = 2;",
            )?;
        }

        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await?
    }

    // --- Row helpers ---

    fn row_to_conversation(row: &rusqlite::Row) -> StoreResult<Conversation> {
        let pinned_int: i32 = row.get(3)?;
        let extra_json: String = row.get(6)?;

        Ok(Conversation {
            id: row.get(0)?,
            name: row.get(1)?,
            model: row.get(2)?,
            pinned: pinned_int != 0,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            extra: serde_json::from_str(&extra_json)?,
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> StoreResult<Message> {
        let role_str: String = row.get(2)?;
        let extra_json: String = row.get(5)?;

        Ok(Message {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: Role::from_str(&role_str).ok_or_else(|| {
                StoreError::Decode(serde::de::Error::custom(format!(
                    "Unknown role: {}",
                    role_str
                )))
            })?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            extra: serde_json::from_str(&extra_json)?,
        })
    }

    fn encode_extra(extra: &Map<String, Value>) -> StoreResult<String> {
        Ok(serde_json::to_string(extra)?)
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn conversations(&self) -> StoreResult<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, model, pinned, created_at, updated_at, extra
                 FROM conversations ORDER BY id",
            )?;
            let conversations = stmt
                .query_map([], |row| Ok(Self::row_to_conversation(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(conversations)
        })
        .await
    }

    async fn insert_conversation(&self, conversation: &NewConversation) -> StoreResult<i64> {
        let conv = conversation.clone();
        let extra = Self::encode_extra(&conv.extra)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO conversations (name, model, pinned, created_at, updated_at, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    conv.name,
                    conv.model,
                    conv.pinned.unwrap_or(false) as i32,
                    conv.created_at,
                    conv.updated_at,
                    extra,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn replace_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        let conv = conversation.clone();
        let extra = Self::encode_extra(&conv.extra)?;
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET name = ?1, model = ?2, pinned = ?3, created_at = ?4, updated_at = ?5, extra = ?6
                 WHERE id = ?7",
                params![
                    conv.name,
                    conv.model,
                    conv.pinned as i32,
                    conv.created_at,
                    conv.updated_at,
                    extra,
                    conv.id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_conversation(&self, id: i64) -> StoreResult<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    async fn messages(&self) -> StoreResult<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, created_at, extra
                 FROM messages ORDER BY id",
            )?;
            let messages = stmt
                .query_map([], |row| Ok(Self::row_to_message(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }

    async fn messages_for(&self, conversation_id: i64) -> StoreResult<Vec<Message>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, created_at, extra
                 FROM messages WHERE conversation_id = ?1 ORDER BY id",
            )?;
            let messages = stmt
                .query_map(params![conversation_id], |row| Ok(Self::row_to_message(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }

    async fn insert_message(&self, message: &NewMessage) -> StoreResult<i64> {
        let msg = message.clone();
        let extra = Self::encode_extra(&msg.extra)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (conversation_id, role, content, created_at, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.conversation_id,
                    msg.role.as_str(),
                    msg.content,
                    msg.created_at,
                    extra,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn delete_messages_for(&self, conversation_id: i64) -> StoreResult<usize> {
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok(removed)
        })
        .await
    }

    async fn delete_messages(&self, ids: &[i64]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            for chunk in ids.chunks(DELETE_CHUNK) {
                let placeholders = vec!["?"; chunk.len()].join(", ");
                removed += tx.execute(
                    &format!("DELETE FROM messages WHERE id IN ({})", placeholders),
                    params_from_iter(chunk.iter()),
                )?;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }
}
