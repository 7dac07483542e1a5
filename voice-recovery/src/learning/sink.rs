//! Durable sink for learning records
//!
//! Persistence lives outside this crate. The store hands every record to a
//! [`DurableSink`] and only logs what comes back.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::LearningRecord;
use crate::error::{RecoveryResult, SinkError};

/// External append-only storage
#[async_trait]
pub trait DurableSink: Send + Sync {
    /// Append one record
    async fn append(&self, record: &LearningRecord) -> Result<(), SinkError>;
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl DurableSink for NullSink {
    async fn append(&self, _record: &LearningRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps records in memory; useful for tests and offline analysis
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LearningRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<LearningRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// All records as JSON lines
    pub async fn to_json_lines(&self) -> RecoveryResult<String> {
        let records = self.records.lock().await;
        let mut out = String::new();
        for record in records.iter() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[async_trait]
impl DurableSink for MemorySink {
    async fn append(&self, record: &LearningRecord) -> Result<(), SinkError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
