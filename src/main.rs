use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chatvault::models::{NewConversation, NewMessage, Role, SortBy, SortOrder};
use chatvault::services::conversations::{now_ms, title_from_text};
use chatvault::services::export::export_to_markdown;
use chatvault::{ConversationStore, Database, FilePreferences, StoreConfig};

#[derive(Parser)]
#[command(name = "chatvault")]
#[command(about = "Manage locally stored chat conversations")]
struct Cli {
    /// Data directory (defaults to $XDG_DATA_HOME/chatvault)
    #[arg(long, env = "CHATVAULT_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversations in the saved sort order
    List,

    /// Create a conversation
    Add {
        /// Title; derived from --first-message when omitted
        name: Option<String>,
        #[arg(long, default_value = "gemini-2.5-flash")]
        model: String,
        /// Seed the conversation with a user message
        #[arg(long)]
        first_message: Option<String>,
    },

    /// Delete a conversation and its messages
    Rm { id: i64 },

    /// Rename a conversation
    Rename { id: i64, name: String },

    /// Change the model of a conversation
    Model { id: i64, model: String },

    /// Pin a conversation to the top of the list
    Pin { id: i64 },

    /// Unpin a conversation
    Unpin { id: i64 },

    /// Append a message to a conversation
    Say {
        id: i64,
        content: String,
        /// user, assistant or system
        #[arg(long, default_value = "user")]
        role: String,
    },

    /// Print the messages of a conversation
    Show { id: i64 },

    /// Print a conversation as Markdown
    Export { id: i64 },

    /// Set the list ordering (updatedAt|createdAt|name|model, asc|desc)
    Sort { by: String, order: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.data_dir {
        Some(dir) => StoreConfig::in_dir(dir),
        None => StoreConfig::from_env().context("Failed to resolve data directory")?,
    };

    let db = Database::open(&config.db_path).context("Failed to open database")?;
    let prefs = FilePreferences::open(&config.prefs_path)
        .await
        .context("Failed to open preferences")?;
    let mut store = ConversationStore::new(Arc::new(db), Arc::new(prefs), config.sort_debounce);

    let report = store
        .initialize()
        .await
        .context("Failed to load conversations")?;
    if let Some(err) = &report.cleanup_error {
        eprintln!("warning: orphaned messages could not be removed: {}", err);
    }

    run(&mut store, cli.command).await?;

    store
        .flush_sort_mode()
        .await
        .context("Failed to save sort preference")?;
    Ok(())
}

async fn run(store: &mut ConversationStore, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            for conv in store.sorted_conversations() {
                let pin = if conv.pinned { "*" } else { " " };
                println!("{}{:>5}  {:<40} {}", pin, conv.id, conv.name, conv.model);
            }
        }
        Commands::Add {
            name,
            model,
            first_message,
        } => {
            let name = match (name, &first_message) {
                (Some(name), _) => name,
                (None, Some(text)) => title_from_text(text),
                (None, None) => "New Chat".to_string(),
            };
            let now = now_ms();
            let id = store
                .add_conversation(NewConversation::new(name, model, now))
                .await?;
            if let Some(text) = first_message {
                store
                    .add_message(NewMessage::new(id, Role::User, text, now))
                    .await?;
            }
            println!("{}", id);
        }
        Commands::Rm { id } => store.del_conversation(id).await?,
        Commands::Rename { id, name } => {
            require(store, id)?;
            store.rename_conversation(id, &name).await?;
        }
        Commands::Model { id, model } => {
            require(store, id)?;
            store.set_conversation_model(id, &model).await?;
        }
        Commands::Pin { id } => {
            require(store, id)?;
            store.pin_conversation(id).await?;
        }
        Commands::Unpin { id } => {
            require(store, id)?;
            store.unpin_conversation(id).await?;
        }
        Commands::Say { id, content, role } => {
            let Some(role) = Role::from_str(&role) else {
                bail!("Unknown role: {}", role);
            };
            let msg_id = store
                .add_message(NewMessage::new(id, role, content, now_ms()))
                .await?;
            println!("{}", msg_id);
        }
        Commands::Show { id } => {
            require(store, id)?;
            for msg in store.messages_for(id).await? {
                println!("[{}] {}", msg.role.as_str(), msg.content);
            }
        }
        Commands::Export { id } => {
            let conv = require(store, id)?;
            let messages = store.messages_for(id).await?;
            print!("{}", export_to_markdown(&conv, &messages));
        }
        Commands::Sort { by, order } => {
            let Some(by) = SortBy::from_str(&by) else {
                bail!("Unknown sort field: {}", by);
            };
            let Some(order) = SortOrder::from_str(&order) else {
                bail!("Unknown sort order: {}", order);
            };
            store.set_sort_mode(by, order);
        }
    }
    Ok(())
}

fn require(store: &ConversationStore, id: i64) -> Result<chatvault::models::Conversation> {
    store
        .get_conversation_by_id(id)
        .with_context(|| format!("Conversation {} not found", id))
}
