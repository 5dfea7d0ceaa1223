use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use super::error::{StoreError, StoreResult};
use super::projection::sort_conversations;
use super::sort_prefs::SortPersister;
use super::traits::{DocumentStore, KeyValueStore};
use crate::models::{
    Conversation, Message, NewConversation, NewMessage, SortBy, SortMode, SortOrder,
};

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Outcome of [`ConversationStore::initialize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    pub conversations: usize,
    pub purged_orphans: usize,
    /// Set when the orphan purge failed. The orphans stay in place and are
    /// found again by the next initialization.
    pub cleanup_error: Option<String>,
}

/// In-memory mirror of the conversation collection, kept in step with the
/// backing document store.
///
/// Every mutating call writes the store first and patches the mirror after,
/// so readers never see a record the store does not hold. Calls are expected
/// to be awaited one at a time; there is no internal locking.
pub struct ConversationStore {
    documents: Arc<dyn DocumentStore>,
    conversations: watch::Sender<Vec<Conversation>>,
    sort_mode: watch::Sender<SortMode>,
    sort_persister: SortPersister,
}

impl ConversationStore {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        preferences: Arc<dyn KeyValueStore>,
        sort_debounce: Duration,
    ) -> Self {
        let (conversations, _) = watch::channel(Vec::new());
        let (sort_mode, _) = watch::channel(SortMode::default());
        Self {
            documents,
            conversations,
            sort_mode,
            sort_persister: SortPersister::new(preferences, sort_debounce),
        }
    }

    /// Load the mirror and sort preference, then purge orphaned messages.
    ///
    /// A failed load leaves the mirror untouched and returns the error. A
    /// failed purge is logged and reported but does not fail the call.
    pub async fn initialize(&mut self) -> StoreResult<InitReport> {
        let conversations = self.documents.conversations().await?;
        let messages = self.documents.messages().await?;

        let live: HashSet<i64> = conversations.iter().map(|c| c.id).collect();
        let orphans: Vec<i64> = messages
            .iter()
            .filter(|m| !live.contains(&m.conversation_id))
            .map(|m| m.id)
            .collect();

        let mut report = InitReport {
            conversations: conversations.len(),
            ..Default::default()
        };
        self.conversations.send_replace(conversations);
        self.sort_mode.send_replace(self.sort_persister.load().await);

        if !orphans.is_empty() {
            match self.documents.delete_messages(&orphans).await {
                Ok(removed) => {
                    tracing::info!("Purged {} orphaned messages", removed);
                    report.purged_orphans = removed;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to purge {} orphaned messages: {}",
                        orphans.len(),
                        e
                    );
                    report.cleanup_error = Some(e.to_string());
                }
            }
        }

        tracing::info!("Loaded {} conversations", report.conversations);
        Ok(report)
    }

    /// Insert a conversation and return its assigned id.
    pub async fn add_conversation(&mut self, conversation: NewConversation) -> StoreResult<i64> {
        let id = self.documents.insert_conversation(&conversation).await?;
        let record = conversation.into_conversation(id);
        self.conversations.send_modify(|list| list.push(record));
        tracing::debug!("Added conversation {}", id);
        Ok(id)
    }

    /// Delete a conversation and all of its messages, messages first.
    /// Deleting an absent id succeeds without touching the mirror.
    pub async fn del_conversation(&mut self, id: i64) -> StoreResult<()> {
        let removed = self.documents.delete_messages_for(id).await?;
        self.documents.delete_conversation(id).await?;
        self.conversations.send_if_modified(|list| {
            let before = list.len();
            list.retain(|c| c.id != id);
            list.len() != before
        });
        tracing::debug!("Deleted conversation {} and {} messages", id, removed);
        Ok(())
    }

    /// Replace the stored record with `conversation`, keyed by its id.
    ///
    /// With `update_time` the record's `updated_at` moves to now (never
    /// backwards); otherwise the caller's value is kept.
    pub async fn update_conversation(
        &mut self,
        mut conversation: Conversation,
        update_time: bool,
    ) -> StoreResult<()> {
        if update_time {
            conversation.updated_at = now_ms().max(conversation.updated_at);
        }
        self.documents.replace_conversation(&conversation).await?;

        let id = conversation.id;
        self.conversations.send_if_modified(|list| {
            match list.iter_mut().find(|c| c.id == id) {
                Some(slot) => {
                    *slot = conversation;
                    true
                }
                None => false,
            }
        });
        tracing::debug!("Updated conversation {}", id);
        Ok(())
    }

    pub async fn pin_conversation(&mut self, id: i64) -> StoreResult<()> {
        self.set_pinned(id, true).await
    }

    pub async fn unpin_conversation(&mut self, id: i64) -> StoreResult<()> {
        self.set_pinned(id, false).await
    }

    // Pinning is not activity, so `updated_at` is left alone.
    async fn set_pinned(&mut self, id: i64, pinned: bool) -> StoreResult<()> {
        let Some(mut conversation) = self.get_conversation_by_id(id) else {
            return Ok(());
        };
        conversation.pinned = pinned;
        self.update_conversation(conversation, false).await
    }

    pub async fn rename_conversation(&mut self, id: i64, name: &str) -> StoreResult<()> {
        let Some(mut conversation) = self.get_conversation_by_id(id) else {
            return Ok(());
        };
        conversation.name = name.to_string();
        self.update_conversation(conversation, true).await
    }

    pub async fn set_conversation_model(&mut self, id: i64, model: &str) -> StoreResult<()> {
        let Some(mut conversation) = self.get_conversation_by_id(id) else {
            return Ok(());
        };
        conversation.model = model.to_string();
        self.update_conversation(conversation, true).await
    }

    pub fn get_conversation_by_id(&self, id: i64) -> Option<Conversation> {
        self.conversations
            .borrow()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Append a message and refresh its conversation's `updated_at`.
    pub async fn add_message(&mut self, message: NewMessage) -> StoreResult<i64> {
        let Some(conversation) = self.get_conversation_by_id(message.conversation_id) else {
            return Err(StoreError::UnknownConversation(message.conversation_id));
        };
        let id = self.documents.insert_message(&message).await?;
        self.update_conversation(conversation, true).await?;
        Ok(id)
    }

    pub async fn messages_for(&self, conversation_id: i64) -> StoreResult<Vec<Message>> {
        self.documents.messages_for(conversation_id).await
    }

    /// Change the sort preference. Unchanged values are ignored; changes are
    /// persisted after a quiet period.
    ///
    /// # Panics
    ///
    /// Panics when a change is made outside a Tokio runtime, since the
    /// delayed write runs as a spawned task.
    pub fn set_sort_mode(&mut self, by: SortBy, order: SortOrder) {
        let mode = SortMode::new(by, order);
        if !self.sort_mode.send_if_modified(|current| {
            if *current == mode {
                return false;
            }
            *current = mode;
            true
        }) {
            return;
        }
        self.sort_persister.schedule(mode);
    }

    pub async fn flush_sort_mode(&mut self) -> StoreResult<()> {
        self.sort_persister.flush().await
    }

    pub fn sort_mode(&self) -> SortMode {
        *self.sort_mode.borrow()
    }

    pub fn subscribe_sort_mode(&self) -> watch::Receiver<SortMode> {
        self.sort_mode.subscribe()
    }

    /// Snapshot of the mirror in store order.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations.borrow().clone()
    }

    pub fn subscribe_conversations(&self) -> watch::Receiver<Vec<Conversation>> {
        self.conversations.subscribe()
    }

    pub fn sorted_conversations(&self) -> Vec<Conversation> {
        sort_conversations(&self.conversations.borrow(), self.sort_mode())
    }
}

/// Derive a conversation title from the first line of `text`.
pub fn title_from_text(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or(text).trim();
    if first_line.chars().count() > 50 {
        let head: String = first_line.chars().take(47).collect();
        format!("{}...", head)
    } else {
        first_line.to_string()
    }
}
