pub mod conversations;
pub mod database;
pub mod error;
pub mod export;
pub mod preferences;
pub mod projection;
pub mod sort_prefs;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use conversations::{ConversationStore, InitReport};
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use preferences::FilePreferences;
pub use traits::{DocumentStore, KeyValueStore};
