use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::database::Database;
use super::error::{StoreError, StoreResult};
use super::traits::{DocumentStore, KeyValueStore};
use crate::models::{Conversation, Message, NewConversation, NewMessage};

fn injected(what: &str) -> StoreError {
    StoreError::Io {
        path: what.to_string(),
        source: std::io::Error::other("injected failure"),
    }
}

/// In-memory preferences that remember every `set` call in order.
#[derive(Default)]
pub struct RecordingPreferences {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingPreferences {
    pub fn with_values(values: &[(&str, &str)]) -> Self {
        let values = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyValueStore for RecordingPreferences {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.fail {
            return Err(injected(key));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.fail {
            return Err(injected(key));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// Wraps a real database and fails selected operations.
pub struct FlakyDocuments {
    pub inner: Database,
    pub fail_message_load: bool,
    pub fail_batch_delete: bool,
    pub fail_insert: bool,
    pub fail_replace: bool,
    pub fail_conv_delete: bool,
    pub fail_messages_for_delete: bool,
}

impl FlakyDocuments {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            fail_message_load: false,
            fail_batch_delete: false,
            fail_insert: false,
            fail_replace: false,
            fail_conv_delete: false,
            fail_messages_for_delete: false,
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn conversations(&self) -> StoreResult<Vec<Conversation>> {
        self.inner.conversations().await
    }

    async fn insert_conversation(&self, conversation: &NewConversation) -> StoreResult<i64> {
        if self.fail_insert {
            return Err(injected("conversations"));
        }
        self.inner.insert_conversation(conversation).await
    }

    async fn replace_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        if self.fail_replace {
            return Err(injected("conversations"));
        }
        self.inner.replace_conversation(conversation).await
    }

    async fn delete_conversation(&self, id: i64) -> StoreResult<()> {
        if self.fail_conv_delete {
            return Err(injected("conversations"));
        }
        self.inner.delete_conversation(id).await
    }

    async fn messages(&self) -> StoreResult<Vec<Message>> {
        if self.fail_message_load {
            return Err(injected("messages"));
        }
        self.inner.messages().await
    }

    async fn messages_for(&self, conversation_id: i64) -> StoreResult<Vec<Message>> {
        self.inner.messages_for(conversation_id).await
    }

    async fn insert_message(&self, message: &NewMessage) -> StoreResult<i64> {
        self.inner.insert_message(message).await
    }

    async fn delete_messages_for(&self, conversation_id: i64) -> StoreResult<usize> {
        if self.fail_messages_for_delete {
            return Err(injected("messages"));
        }
        self.inner.delete_messages_for(conversation_id).await
    }

    async fn delete_messages(&self, ids: &[i64]) -> StoreResult<usize> {
        if self.fail_batch_delete {
            return Err(injected("messages"));
        }
        self.inner.delete_messages(ids).await
    }
}
