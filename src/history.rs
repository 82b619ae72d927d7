use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::HttpMethod;
use crate::request::{KeyValue, RequestParams};
use crate::response::ResponseRecord;
use crate::storage::{Storage, HISTORY_KEY};

/// Most entries kept; older ones fall off the end.
pub const HISTORY_LIMIT: usize = 50;

/// What was sent, as entered in the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub params: RequestParams,
    pub body: String,
    pub headers: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub method: HttpMethod,
    /// Path template, used to find the endpoint again.
    pub path: String,
    pub url: String,
    pub status: u16,
    pub request: CapturedRequest,
    pub response: ResponseRecord,
}

impl HistoryEntry {
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        url: impl Into<String>,
        request: CapturedRequest,
        response: ResponseRecord,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            method,
            path: path.into(),
            url: url.into(),
            status: response.status,
            request,
            response,
        }
    }
}

/// Newest-first, bounded list of executed requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn entries(&self) -> &[HistoryEntry] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Zero-based position, newest first.
    pub fn nth(&self, index: usize) -> Option<&HistoryEntry> { self.entries.get(index) }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    /// Read the persisted list. A corrupt value is logged and treated as empty
    /// rather than blocking startup.
    pub async fn load(store: &dyn Storage) -> Result<Self> {
        let Some(raw) = store.get(HISTORY_KEY).await? else {
            return Ok(Self::default());
        };
        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(HISTORY_LIMIT);
                debug!(count = entries.len(), "loaded history");
                Ok(Self { entries })
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable history");
                Ok(Self::default())
            }
        }
    }

    pub async fn persist(&self, store: &dyn Storage) -> Result<()> {
        let raw = serde_json::to_string(&self.entries).context("encoding history")?;
        store.set(HISTORY_KEY, &raw).await
    }

    pub async fn clear(&mut self, store: &dyn Storage) -> Result<()> {
        self.entries.clear();
        store.delete(HISTORY_KEY).await
    }
}

/// "Just now", "N minutes ago", "N hours ago", then the local date and time.
pub fn format_timestamp(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    match secs {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => format!("{} minutes ago", s / 60),
        s if s < 86_400 => format!("{} hours ago", s / 3_600),
        _ => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn entry(status: u16) -> HistoryEntry {
        let mut response = ResponseRecord::network_error("x");
        response.status = status;
        HistoryEntry::new(HttpMethod::Get, "/v1/media", "https://api.img.pro/v1/media", CapturedRequest::default(), response)
    }

    #[test]
    fn bounded_newest_first() {
        let mut h = History::default();
        for i in 0..51u16 {
            h.push(entry(200 + i));
        }
        assert_eq!(h.len(), HISTORY_LIMIT);
        assert_eq!(h.entries()[0].status, 250);
        assert_eq!(h.entries()[49].status, 201);
    }

    #[tokio::test]
    async fn persist_load_clear() {
        let store = MemoryStore::new();
        let mut h = History::default();
        h.push(entry(200));
        h.push(entry(404));
        h.persist(&store).await.unwrap();

        let loaded = History::load(&store).await.unwrap();
        assert_eq!(loaded, h);
        let first = loaded.nth(0).unwrap();
        assert_eq!(loaded.get(first.id).unwrap().status, 404);

        h.clear(&store).await.unwrap();
        assert!(h.is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_history_loads_empty() {
        let store = MemoryStore::with_entries([(HISTORY_KEY, "{not a list")]);
        assert!(History::load(&store).await.unwrap().is_empty());
    }

    #[test]
    fn relative_timestamps() {
        let now = Utc::now();
        assert_eq!(format_timestamp(now - Duration::seconds(5), now), "Just now");
        assert_eq!(format_timestamp(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_timestamp(now - Duration::hours(3), now), "3 hours ago");
        let old = format_timestamp(now - Duration::days(2), now);
        assert!(!old.ends_with("ago"));
        assert_eq!(old.len(), "2024-01-01 00:00:00".len());
    }
}
