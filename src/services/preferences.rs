use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::error::{StoreError, StoreResult};
use super::traits::KeyValueStore;

static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Key-value preferences kept in a small JSON file next to the database.
///
/// The file is read once on open and replaced in full on every `set`. Each
/// save goes to its own temp file which is then renamed over the target, so
/// a reader never sees a half-written file.
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(
                        "Ignoring unreadable preferences file {}: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            SAVE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)
    }
}

#[async_trait]
impl KeyValueStore for FilePreferences {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(dir.path().join("preferences.json"))
            .await
            .unwrap();
        assert_eq!(prefs.get("conversation_sort_by").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let prefs = FilePreferences::open(&path).await.unwrap();
        prefs.set("conversation_sort_by", "name").await.unwrap();
        prefs.set("conversation_sort_order", "asc").await.unwrap();
        drop(prefs);

        let reopened = FilePreferences::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("conversation_sort_by").await.unwrap().as_deref(),
            Some("name")
        );
        assert_eq!(
            reopened.get("conversation_sort_order").await.unwrap().as_deref(),
            Some("asc")
        );
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let prefs = FilePreferences::open(&path).await.unwrap();
        prefs.set("conversation_sort_by", "model").await.unwrap();
        prefs.set("conversation_sort_by", "name").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["preferences.json".to_string()]);

        let saved: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["conversation_sort_by"], "name");
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{not json").unwrap();

        let prefs = FilePreferences::open(&path).await.unwrap();
        assert_eq!(prefs.get("anything").await.unwrap(), None);
    }
}
