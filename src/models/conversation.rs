use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A conversation as held by the backing store and the in-memory mirror.
///
/// Timestamps are milliseconds since the Unix epoch. `extra` carries attributes
/// this crate does not interpret; they are written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub pinned: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// A conversation that has not been inserted yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub pinned: Option<bool>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl NewConversation {
    /// A fresh conversation stamped with the same creation and update time.
    pub fn new(name: impl Into<String>, model: impl Into<String>, now_ms: i64) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            pinned: None,
            created_at: now_ms,
            updated_at: now_ms,
            extra: Map::new(),
        }
    }

    pub fn into_conversation(self, id: i64) -> Conversation {
        Conversation {
            id,
            name: self.name,
            model: self.model,
            pinned: self.pinned.unwrap_or(false),
            created_at: self.created_at,
            updated_at: self.updated_at,
            extra: self.extra,
        }
    }
}
