use async_trait::async_trait;

use super::error::StoreResult;
use crate::models::{Conversation, Message, NewConversation, NewMessage};

/// Document store holding the `conversations` and `messages` collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every conversation, in store order.
    async fn conversations(&self) -> StoreResult<Vec<Conversation>>;

    /// Insert and return the assigned id.
    async fn insert_conversation(&self, conversation: &NewConversation) -> StoreResult<i64>;

    /// Whole-record replace keyed by `conversation.id`.
    async fn replace_conversation(&self, conversation: &Conversation) -> StoreResult<()>;

    async fn delete_conversation(&self, id: i64) -> StoreResult<()>;

    /// Every message, in store order.
    async fn messages(&self) -> StoreResult<Vec<Message>>;

    async fn messages_for(&self, conversation_id: i64) -> StoreResult<Vec<Message>>;

    async fn insert_message(&self, message: &NewMessage) -> StoreResult<i64>;

    /// Bulk delete by `conversation_id` equality. Returns the number removed.
    async fn delete_messages_for(&self, conversation_id: i64) -> StoreResult<usize>;

    /// Bulk delete by id membership, as a single batch. Returns the number removed.
    async fn delete_messages(&self, ids: &[i64]) -> StoreResult<usize>;
}

/// Small string key-value persistence for user preferences.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}
