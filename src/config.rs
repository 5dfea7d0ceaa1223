use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::error::{StoreError, StoreResult};

pub const APP_ID: &str = "chatvault";

/// Quiet period before a sort preference change is written out.
pub const SORT_PERSIST_DEBOUNCE: Duration = Duration::from_millis(300);

pub const SORT_BY_KEY: &str = "conversation_sort_by";
pub const SORT_ORDER_KEY: &str = "conversation_sort_order";

const DB_FILE: &str = "chatvault.db";
const PREFS_FILE: &str = "preferences.json";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub prefs_path: PathBuf,
    pub sort_debounce: Duration,
}

impl StoreConfig {
    /// Resolve the data directory from `CHATVAULT_DATA_DIR`, then
    /// `XDG_DATA_HOME`, then `$HOME/.local/share`.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self::in_dir(data_dir()?))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            db_path: dir.join(DB_FILE),
            prefs_path: dir.join(PREFS_FILE),
            sort_debounce: SORT_PERSIST_DEBOUNCE,
        }
    }
}

fn data_dir() -> StoreResult<PathBuf> {
    if let Ok(dir) = std::env::var("CHATVAULT_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = match std::env::var("XDG_DATA_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").map_err(|_| StoreError::Io {
                path: "$HOME".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"),
            })?;
            PathBuf::from(home).join(".local/share")
        }
    };
    Ok(base.join(APP_ID))
}
