//! Conversation persistence for a desktop chat client: an in-memory mirror
//! over a SQLite document store with cascading deletes, orphan cleanup and a
//! persisted list ordering.

pub mod config;
pub mod models;
pub mod services;

pub use config::StoreConfig;
pub use services::{ConversationStore, Database, FilePreferences, InitReport, StoreError};
