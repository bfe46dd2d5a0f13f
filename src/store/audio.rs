//! Uploaded audio files and their provider-side file ids.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tokio::sync::RwLock;

/// How long the audio view stays cached before it is rebuilt.
const VIEW_TTL: Duration = Duration::from_secs(300);

/// A previously uploaded audio file.
#[derive(Debug, Clone)]
pub struct AudioRecord {
    /// Lowercased lookup key, the file name without extension
    pub key: String,
    /// Provider-assigned file id for re-sending without upload
    pub file_id: String,
    /// Hex digest of the file content at upload time
    pub file_hash: String,
    /// When the upload happened
    pub created_at: DateTime<Utc>,
}

/// Audio record persistence.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Look up a record by key. Keys are matched case-insensitively.
    async fn get_by_key(&self, key: &str) -> Result<Option<AudioRecord>>;

    /// Store a record, replacing any existing one under the same key.
    async fn add(&self, record: AudioRecord) -> Result<()>;

    /// Remove the record under the key, if any.
    async fn remove_by_key(&self, key: &str) -> Result<()>;
}

/// `RwLock`-backed audio store with a TTL-cached lookup view.
pub struct InMemoryAudioStore {
    records: RwLock<HashMap<String, AudioRecord>>,
    view: Cache<(), Arc<HashMap<String, AudioRecord>>>,
}

impl InMemoryAudioStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            view: Cache::builder()
                .max_capacity(1)
                .time_to_live(VIEW_TTL)
                .build(),
        }
    }

    async fn snapshot(&self) -> Arc<HashMap<String, AudioRecord>> {
        self.view
            .get_with((), async {
                let records = self.records.read().await;
                Arc::new(records.clone())
            })
            .await
    }
}

impl Default for InMemoryAudioStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioStore for InMemoryAudioStore {
    async fn get_by_key(&self, key: &str) -> Result<Option<AudioRecord>> {
        let snapshot = self.snapshot().await;
        Ok(snapshot.get(&key.to_lowercase()).cloned())
    }

    async fn add(&self, record: AudioRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.key.to_lowercase(), record);
        drop(records);
        self.view.invalidate(&()).await;
        Ok(())
    }

    async fn remove_by_key(&self, key: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(&key.to_lowercase());
        drop(records);
        self.view.invalidate(&()).await;
        Ok(())
    }
}
