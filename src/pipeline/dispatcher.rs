use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use tracing::{debug, info, trace};

use super::stage::{SendResult, Stage};
use crate::pipeline::tracker::JobStateTracker;
use crate::pipeline::tracker::resume::ResumeEntry;
use crate::types::error::TransferError;
use crate::types::job::{
    ChunkId, ChunkJob, ChunkKind, JobStatus, Operation, ScheduledChunk, TransferJob,
};
use crate::types::{ObjectDescriptor, PropertyChanges, TransferStatistics};

/// Splits an object into the chunks of one job.
///
/// Objects at or below `threshold` get a single data chunk, larger ones are cut into
/// `chunk_size` pieces with a shorter last piece. A copy carrying property changes
/// ends with a `Properties` chunk.
pub fn partition_into_chunks(
    size: u64,
    operation: Operation,
    has_changes: bool,
    threshold: u64,
    chunk_size: u64,
) -> Result<Vec<ChunkKind>, TransferError> {
    if operation == Operation::SetProperties {
        return Ok(vec![ChunkKind::Properties]);
    }

    if chunk_size == 0 {
        return Err(TransferError::DispatchError(
            "chunk size must be greater than zero.".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    if size <= threshold {
        chunks.push(ChunkKind::Data {
            offset: 0,
            length: size,
        });
    } else {
        let mut offset = 0;
        while offset < size {
            let length = chunk_size.min(size - offset);
            chunks.push(ChunkKind::Data { offset, length });
            offset += length;
        }
    }

    if has_changes {
        chunks.push(ChunkKind::Properties);
    }

    Ok(chunks)
}

pub struct JobDispatcher {
    base: Stage<ObjectDescriptor, ScheduledChunk>,
    tracker: Arc<JobStateTracker>,
    completed: BTreeMap<String, ResumeEntry>,
    changes: Option<Arc<PropertyChanges>>,
}

impl JobDispatcher {
    pub fn new(
        base: Stage<ObjectDescriptor, ScheduledChunk>,
        tracker: Arc<JobStateTracker>,
        completed: BTreeMap<String, ResumeEntry>,
    ) -> Self {
        let changes = if base.config.property_changes.is_empty() {
            None
        } else {
            Some(Arc::new(base.config.property_changes.clone()))
        };

        Self {
            base,
            tracker,
            completed,
            changes,
        }
    }

    pub fn dispatch(&self, object: ObjectDescriptor) -> Result<TransferJob, TransferError> {
        let operation = self.base.config.operation;
        let kinds = partition_into_chunks(
            object.size(),
            operation,
            self.changes.is_some(),
            self.base.config.transfer_config.multipart_threshold,
            self.base.config.transfer_config.multipart_chunksize,
        )?;

        let id = self.tracker.allocate_job_id();
        let chunks = kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| {
                ChunkJob::new(
                    ChunkId {
                        job_id: id,
                        index: index as u32,
                    },
                    kind,
                )
            })
            .collect();

        Ok(TransferJob {
            id,
            destination_key: object.key(),
            source: object,
            operation,
            changes: self.changes.clone(),
            status: JobStatus::Queued,
            chunks,
            created_at: Utc::now(),
            completed_at: None,
            attempts: 0,
            last_failure: None,
        })
    }

    pub async fn run(&self) -> Result<()> {
        trace!("job dispatcher has started.");

        loop {
            tokio::task::yield_now().await;
            if self.base.cancellation_token.is_cancelled() {
                debug!("job dispatcher has been cancelled.");
                return Ok(());
            }

            match self.base.receiver.as_ref().unwrap().recv().await {
                Ok(object) => {
                    if self.dispatch_object(object).await? == SendResult::Closed {
                        return Ok(());
                    }
                }
                Err(_) => {
                    if self.tracker.seal() {
                        self.base.sender.as_ref().unwrap().close();
                    }

                    debug!("job dispatcher has been completed.");
                    return Ok(());
                }
            }
        }
    }

    async fn dispatch_object(&self, object: ObjectDescriptor) -> Result<SendResult> {
        let key = object.key();

        if let Some(entry) = self.completed.get(&key) {
            info!(key = key, "already completed in a previous run. skipping.");

            self.tracker.record_skip(&key, entry.clone());
            self.base
                .send_stats(TransferStatistics::JobSkip { key })
                .await;

            return Ok(SendResult::Success);
        }

        let job = self.dispatch(object).map_err(|e| anyhow!(e))?;
        trace!(
            job_id = job.id,
            key = key,
            chunks = job.chunks.len(),
            "job dispatched."
        );

        for chunk in self.tracker.register(job) {
            if self.base.send(chunk).await? == SendResult::Closed {
                return Ok(SendResult::Closed);
            }
        }

        Ok(SendResult::Success)
    }
}
