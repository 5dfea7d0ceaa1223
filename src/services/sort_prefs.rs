use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::error::StoreResult;
use super::traits::KeyValueStore;
use crate::config::{SORT_BY_KEY, SORT_ORDER_KEY};
use crate::models::{SortBy, SortMode, SortOrder};

/// Trailing-edge debounced writer for the conversation sort preference.
///
/// Each `schedule` call replaces the pending write, so a burst of changes
/// produces one write carrying the last value. A pending write is not
/// awaited on drop; call `flush` on shutdown to keep the latest value.
pub struct SortPersister {
    store: Arc<dyn KeyValueStore>,
    delay: Duration,
    pending: Option<(SortMode, JoinHandle<StoreResult<()>>)>,
}

impl SortPersister {
    pub fn new(store: Arc<dyn KeyValueStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: None,
        }
    }

    /// Read the persisted mode. Missing, unreadable or unknown values fall
    /// back to the default field by field.
    pub async fn load(&self) -> SortMode {
        let default = SortMode::default();
        let by = self
            .read(SORT_BY_KEY)
            .await
            .and_then(|s| SortBy::from_str(&s))
            .unwrap_or(default.by);
        let order = self
            .read(SORT_ORDER_KEY)
            .await
            .and_then(|s| SortOrder::from_str(&s))
            .unwrap_or(default.order);
        SortMode { by, order }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read preference {}: {}", key, e);
                None
            }
        }
    }

    /// Replace any pending write with one for `mode`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn schedule(&mut self, mode: SortMode) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }

        let store = self.store.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = write(store.as_ref(), mode).await;
            if let Err(e) = &result {
                tracing::warn!("Failed to persist sort mode: {}", e);
            }
            result
        });
        self.pending = Some((mode, handle));
    }

    /// Make sure the last scheduled mode is stored, writing it now if the
    /// timer has not fired yet or its write failed.
    pub async fn flush(&mut self) -> StoreResult<()> {
        let Some((mode, handle)) = self.pending.take() else {
            return Ok(());
        };
        if !handle.is_finished() {
            handle.abort();
        }
        // awaiting the aborted task keeps its write from overlapping ours
        match handle.await {
            Ok(Ok(())) => Ok(()),
            _ => write(self.store.as_ref(), mode).await,
        }
    }
}

async fn write(store: &dyn KeyValueStore, mode: SortMode) -> StoreResult<()> {
    store.set(SORT_BY_KEY, mode.by.as_str()).await?;
    store.set(SORT_ORDER_KEY, mode.order.as_str()).await?;
    tracing::debug!(
        "Persisted sort mode {} {}",
        mode.by.as_str(),
        mode.order.as_str()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::RecordingPreferences;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn test_load_defaults_when_absent() {
        let prefs = Arc::new(RecordingPreferences::default());
        let persister = SortPersister::new(prefs, DEBOUNCE);
        assert_eq!(persister.load().await, SortMode::default());
    }

    #[tokio::test]
    async fn test_load_ignores_unknown_values() {
        let prefs = Arc::new(RecordingPreferences::with_values(&[
            (SORT_BY_KEY, "name"),
            (SORT_ORDER_KEY, "sideways"),
        ]));
        let persister = SortPersister::new(prefs, DEBOUNCE);
        assert_eq!(
            persister.load().await,
            SortMode::new(SortBy::Name, SortOrder::Desc)
        );
    }

    #[tokio::test]
    async fn test_load_survives_read_failure() {
        let prefs = Arc::new(RecordingPreferences::failing());
        let persister = SortPersister::new(prefs, DEBOUNCE);
        assert_eq!(persister.load().await, SortMode::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_last_value() {
        let prefs = Arc::new(RecordingPreferences::default());
        let mut persister = SortPersister::new(prefs.clone(), DEBOUNCE);

        persister.schedule(SortMode::new(SortBy::Name, SortOrder::Desc));
        tokio::time::sleep(Duration::from_millis(50)).await;
        persister.schedule(SortMode::new(SortBy::Model, SortOrder::Desc));
        tokio::time::sleep(Duration::from_millis(50)).await;
        persister.schedule(SortMode::new(SortBy::Name, SortOrder::Asc));
        assert!(prefs.writes().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(
            prefs.writes(),
            vec![
                (SORT_BY_KEY.to_string(), "name".to_string()),
                (SORT_ORDER_KEY.to_string(), "asc".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_reports_failed_timer_write() {
        let prefs = Arc::new(RecordingPreferences::failing());
        let mut persister = SortPersister::new(prefs, DEBOUNCE);

        persister.schedule(SortMode::new(SortBy::Model, SortOrder::Asc));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(persister.flush().await.is_err());
        // nothing is pending once flushed
        assert!(persister.flush().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_after_timer_write_does_not_rewrite() {
        let prefs = Arc::new(RecordingPreferences::default());
        let mut persister = SortPersister::new(prefs.clone(), DEBOUNCE);

        persister.schedule(SortMode::new(SortBy::Name, SortOrder::Asc));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(prefs.writes().len(), 2);

        persister.flush().await.unwrap();
        assert_eq!(prefs.writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_without_waiting() {
        let prefs = Arc::new(RecordingPreferences::default());
        let mut persister = SortPersister::new(prefs.clone(), DEBOUNCE);

        persister.schedule(SortMode::new(SortBy::UpdatedAt, SortOrder::Asc));
        persister.flush().await.unwrap();
        assert_eq!(prefs.writes().len(), 2);

        // the aborted timer must not write a second time
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(prefs.writes().len(), 2);
        persister.flush().await.unwrap();
        assert_eq!(prefs.writes().len(), 2);
    }
}
