use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::error::StorageErrorKind;
use crate::types::{ObjectDescriptor, PropertyChanges};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Copy,
    SetProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    pub job_id: JobId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Data { offset: u64, length: u64 },
    Properties,
}

impl ChunkKind {
    pub fn data_length(&self) -> u64 {
        match self {
            ChunkKind::Data { length, .. } => *length,
            ChunkKind::Properties => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Queued,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl ChunkStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChunkStatus::Completed | ChunkStatus::Failed | ChunkStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkJob {
    pub id: ChunkId,
    pub kind: ChunkKind,
    pub attempts: u32,
    pub status: ChunkStatus,
}

impl ChunkJob {
    pub fn new(id: ChunkId, kind: ChunkKind) -> Self {
        Self {
            id,
            kind,
            attempts: 0,
            status: ChunkStatus::Queued,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureInfo {
    pub kind: Option<StorageErrorKind>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct TransferJob {
    pub id: JobId,
    pub source: ObjectDescriptor,
    pub destination_key: String,
    pub operation: Operation,
    pub changes: Option<Arc<PropertyChanges>>,
    pub status: JobStatus,
    pub chunks: Vec<ChunkJob>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_failure: Option<FailureInfo>,
}

impl TransferJob {
    pub fn source_key(&self) -> String {
        self.source.key()
    }

    /// Builds the queue item that carries one of this job's chunks to a worker.
    pub fn schedule(&self, chunk: &ChunkJob) -> ScheduledChunk {
        ScheduledChunk {
            id: chunk.id,
            kind: chunk.kind,
            source_key: self.source.key(),
            destination_key: self.destination_key.clone(),
            object_size: self.source.size(),
            operation: self.operation,
            changes: self.changes.clone(),
        }
    }
}

/// A chunk travelling through the scheduler queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledChunk {
    pub id: ChunkId,
    pub kind: ChunkKind,
    pub source_key: String,
    pub destination_key: String,
    pub object_size: u64,
    pub operation: Operation,
    pub changes: Option<Arc<PropertyChanges>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub queued: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub skipped: u64,
    pub transferred_bytes: u64,
}

impl JobSummary {
    pub fn total(&self) -> u64 {
        self.queued + self.active + self.completed + self.failed + self.cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AllSucceeded,
    PartialFailure,
    TotalFailure,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedObject {
    pub key: String,
    pub kind: Option<StorageErrorKind>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub summary: JobSummary,
    pub failures: Vec<FailedObject>,
}
