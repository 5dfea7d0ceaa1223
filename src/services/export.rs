use chrono::{DateTime, Utc};

use crate::models::{Conversation, Message, Role};

pub fn export_to_markdown(conversation: &Conversation, messages: &[Message]) -> String {
    let mut output = format!("# {}\n\n", conversation.name);
    output.push_str(&format!(
        "> Model: {} | Date: {}\n\n",
        conversation.model,
        format_ms(conversation.created_at)
    ));

    if let Some(prompt) = conversation.extra.get("systemPrompt").and_then(|v| v.as_str()) {
        output.push_str(&format!("> System Prompt: {}\n\n", prompt));
    }

    output.push_str("---\n\n");

    for msg in messages {
        let role_label = match msg.role {
            Role::User => "You",
            Role::Assistant => conversation.model.as_str(),
            Role::System => "System",
        };
        output.push_str(&format!("### {}\n\n{}\n\n", role_label, msg.content));
    }

    output
}

fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
