pub mod conversation;
pub mod message;
pub mod sort;

pub use conversation::{Conversation, NewConversation};
pub use message::{Message, NewMessage, Role};
pub use sort::{SortBy, SortMode, SortOrder};
