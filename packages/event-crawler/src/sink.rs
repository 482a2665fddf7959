//! Output sink: an append-only stream of cleaned event records.
//!
//! No dedupe lives here; uniqueness is a property of the detail-URL set
//! upstream.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

use crate::error::{CrawlerError, Result};
use crate::types::EventRecord;

/// Append-only record sink.
#[async_trait]
pub trait Dataset: Send + Sync {
    async fn push(&self, record: &EventRecord) -> Result<()>;
}

// Shared handles work as sinks too, so a caller can keep one for reading
// back what a run produced.
#[async_trait]
impl<D: Dataset + ?Sized> Dataset for std::sync::Arc<D> {
    async fn push(&self, record: &EventRecord) -> Result<()> {
        (**self).push(record).await
    }
}

/// JSON-lines file sink: one record per line.
pub struct JsonlDataset {
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonlDataset {
    /// Open a dataset file for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| CrawlerError::Sink(e.to_string().into()))?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
        })
    }
}

#[async_trait]
impl Dataset for JsonlDataset {
    async fn push(&self, record: &EventRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| CrawlerError::Sink(e.to_string().into()))?;
        file.flush()
            .await
            .map_err(|e| CrawlerError::Sink(e.to_string().into()))?;
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct MemoryDataset {
    records: Mutex<Vec<EventRecord>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl Dataset for MemoryDataset {
    async fn push(&self, record: &EventRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, name: Option<&str>) -> EventRecord {
        EventRecord {
            url: url.to_string(),
            name: name.map(str::to_string),
            description: None,
            start_date: None,
            end_date: None,
            venue: None,
            address: None,
            city: None,
            postal_code: None,
            latitude: None,
            longitude: None,
            images: None,
        }
    }

    #[tokio::test]
    async fn memory_dataset_appends_in_order() {
        let sink = MemoryDataset::new();
        sink.push(&record("https://venue.example/event/1", Some("A")))
            .await
            .unwrap();
        sink.push(&record("https://venue.example/event/2", Some("B")))
            .await
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("A"));
        assert_eq!(records[1].name.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn jsonl_dataset_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let sink = JsonlDataset::open(&path).await.unwrap();
        sink.push(&record("https://venue.example/event/1", Some("A")))
            .await
            .unwrap();
        sink.push(&record("https://venue.example/event/2", None))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "A");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second.get("name").is_none());
    }

    #[tokio::test]
    async fn jsonl_dataset_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        {
            let sink = JsonlDataset::open(&path).await.unwrap();
            sink.push(&record("https://venue.example/event/1", Some("A")))
                .await
                .unwrap();
        }
        {
            let sink = JsonlDataset::open(&path).await.unwrap();
            sink.push(&record("https://venue.example/event/2", Some("B")))
                .await
                .unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
