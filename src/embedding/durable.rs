//! Durable cache tier.
//!
//! Best-effort string store with per-entry expiry. Callers treat every
//! error as a cache miss or a skipped write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-local durable tier, mainly for tests and single-run CLIs.
#[derive(Debug, Default)]
pub struct InMemoryDurableCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryDurableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DurableCache for InMemoryDurableCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone());
        if live.is_none() {
            self.entries.remove_if(key, |_, entry| entry.1 <= now);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct FileRecord {
    /// Unix milliseconds.
    expires_at: i64,
    value: String,
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileDurableCache {
    directory: PathBuf,
}

impl FileDurableCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl DurableCache for FileDurableCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        let record: FileRecord = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
        if record.expires_at <= Utc::now().timestamp_millis() {
            self.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(record.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("creating {}", self.directory.display()))?;

        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let record = FileRecord {
            expires_at: Utc::now().timestamp_millis().saturating_add(ttl_ms),
            value,
        };
        let path = self.path_for(key);
        tokio::fs::write(&path, serde_json::to_vec(&record)?)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
