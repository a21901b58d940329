use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Persisted high-water mark for the booking check.
///
/// The mark lives in a small JSON file and is re-read on every run, so it
/// survives restarts and redeploys. The mutex serializes file access within
/// one process; concurrent check invocations can still both pass the same
/// mark and double-notify, which matches the at-least-once contract of the
/// check.
pub struct WatermarkStore {
    path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    last_processed_at: DateTime<Utc>,
}

impl WatermarkStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// The creation time of the newest booking processed so far, if any run
    /// has completed yet.
    pub async fn last_processed_at(&self) -> Option<DateTime<Utc>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Move the mark forward. A value at or behind the current mark is a
    /// no-op, so replayed runs cannot rewind it.
    pub async fn advance(&self, to: DateTime<Utc>) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(current) = self.read().await {
            if current >= to {
                return Ok(());
            }
        }
        let raw = serde_json::to_string(&WatermarkFile {
            last_processed_at: to,
        })
        .map_err(io::Error::other)?;
        tokio::fs::write(&self.path, raw).await
    }

    async fn read(&self) -> Option<DateTime<Utc>> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        serde_json::from_str::<WatermarkFile>(&raw)
            .ok()
            .map(|w| w.last_processed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mark(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn missing_file_means_no_mark() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("mark.json"));
        assert!(store.last_processed_at().await.is_none());
    }

    #[tokio::test]
    async fn advance_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("mark.json"));

        store.advance(mark(9)).await.unwrap();
        assert_eq!(store.last_processed_at().await, Some(mark(9)));
    }

    #[tokio::test]
    async fn advance_never_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("mark.json"));

        store.advance(mark(10)).await.unwrap();
        store.advance(mark(8)).await.unwrap();
        assert_eq!(store.last_processed_at().await, Some(mark(10)));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_no_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mark.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let store = WatermarkStore::new(path);
        assert!(store.last_processed_at().await.is_none());
        store.advance(mark(9)).await.unwrap();
        assert_eq!(store.last_processed_at().await, Some(mark(9)));
    }
}
