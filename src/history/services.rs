use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::dto::HistoryEntry;
use super::repo::HistoryStore;
use crate::recognition::dto::RecognitionResult;

/// Bounded, newest-first scan history kept as one serialized list.
///
/// Every write is a whole-list read-modify-write. The mutex only serializes
/// writers inside this process; separate processes sharing a store still
/// race and the last write wins.
pub struct HistoryService {
    store: Arc<dyn HistoryStore>,
    cap: usize,
    write_lock: Mutex<()>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn HistoryStore>, cap: usize) -> Self {
        Self {
            store,
            cap,
            write_lock: Mutex::new(()),
        }
    }

    /// Missing or unreadable history reads as empty.
    pub async fn list(&self) -> Vec<HistoryEntry> {
        let blob = match self.store.load().await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(error = %e, "failed to load history");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<HistoryEntry>>(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "stored history is not a valid entry list; ignoring it");
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<HistoryEntry> {
        self.list().await.into_iter().find(|e| e.id == id)
    }

    /// Prepends a new entry and truncates to the cap. A failed save is
    /// logged and the entry is still returned to the caller.
    pub async fn record(&self, image_url: String, result: RecognitionResult) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            timestamp: now_millis(),
            image_url,
            result,
        };

        let _guard = self.write_lock.lock().await;
        let mut entries = self.list().await;
        entries.insert(0, entry.clone());
        entries.truncate(self.cap);

        match serde_json::to_string(&entries) {
            Ok(blob) => match self.store.save(blob).await {
                Ok(()) => debug!(id = %entry.id, len = entries.len(), "history saved"),
                Err(e) => error!(error = %e, id = %entry.id, "failed to save history"),
            },
            Err(e) => error!(error = %e, "failed to serialize history"),
        }

        entry
    }

    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.store.remove().await {
            error!(error = %e, "failed to clear history");
        }
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
