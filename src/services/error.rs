use thiserror::Error;

/// Failures surfaced by the conversation store and its backing stores.
///
/// A missing id is never an error here: lookups return `Option` and deletes of
/// absent records succeed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Database connection lock poisoned")]
    Poisoned,

    #[error("Invalid stored data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversation {0} does not exist")]
    UnknownConversation(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;
