//! Append-only record of where each relayed message landed.

use crate::error::{AggregatorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Source and destination coordinates of one successful post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub workspace: String,
    pub source_timestamp: String,
    pub source_channel_name: String,
    pub text: String,
    pub dest_channel: String,
    pub dest_timestamp: String,
    pub logged_at: DateTime<Utc>,
}

impl CorrelationRecord {
    pub fn new(
        workspace: impl Into<String>,
        source_timestamp: impl Into<String>,
        source_channel_name: impl Into<String>,
        text: impl Into<String>,
        dest_channel: impl Into<String>,
        dest_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            source_timestamp: source_timestamp.into(),
            source_channel_name: source_channel_name.into(),
            text: text.into(),
            dest_channel: dest_channel.into(),
            dest_timestamp: dest_timestamp.into(),
            logged_at: Utc::now(),
        }
    }
}

/// Durable sink for correlation records. Appends may arrive concurrently.
#[async_trait]
pub trait CorrelationLog: Send + Sync {
    async fn append(&self, record: CorrelationRecord) -> Result<()>;
}

/// Keeps records in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryCorrelationLog {
    records: RwLock<Vec<CorrelationRecord>>,
}

impl MemoryCorrelationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<CorrelationRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CorrelationLog for MemoryCorrelationLog {
    async fn append(&self, record: CorrelationRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }
}

/// One JSON object per line, appended to a file.
pub struct JsonlCorrelationLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlCorrelationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the parent directory if needed
    pub async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Read every record back, in append order.
    pub async fn load(&self) -> Result<Vec<CorrelationRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AggregatorError::from))
            .collect()
    }
}

#[async_trait]
impl CorrelationLog for JsonlCorrelationLog {
    async fn append(&self, record: CorrelationRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                AggregatorError::CorrelationLog(format!(
                    "failed to open {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::trace!(
            path = %self.path.display(),
            dest_ts = %record.dest_timestamp,
            "Appended correlation record"
        );
        Ok(())
    }
}
