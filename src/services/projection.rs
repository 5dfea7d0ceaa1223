use std::cmp::Ordering;

use crate::models::{Conversation, SortBy, SortMode, SortOrder};

/// Sorted view of the conversation list.
///
/// Pinned conversations always come first. Within each group the list is
/// ordered by `mode`, and ties fall back to ascending id so the output is
/// deterministic.
pub fn sort_conversations(conversations: &[Conversation], mode: SortMode) -> Vec<Conversation> {
    let mut sorted = conversations.to_vec();
    sorted.sort_by(|a, b| compare(a, b, mode));
    sorted
}

pub fn compare(a: &Conversation, b: &Conversation, mode: SortMode) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| {
            let ord = match mode.by {
                SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::Name => compare_text(&a.name, &b.name),
                SortBy::Model => compare_text(&a.model, &b.model),
            };
            match mode.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
