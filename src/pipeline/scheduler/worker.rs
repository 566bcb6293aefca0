use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, trace, warn};

use crate::pipeline::rate_limit::RateLimits;
use crate::pipeline::scheduler::retry;
use crate::pipeline::stage::Stage;
use crate::pipeline::tracker::{ChunkOutcome, JobStateTracker, RecordResult};
use crate::types::TransferStatistics;
use crate::types::error::{TransferError, classify_error};
use crate::types::job::{ChunkKind, FailureInfo, JobStatus, Operation, ScheduledChunk};

pub struct ChunkWorker {
    worker_index: u16,
    base: Stage<ScheduledChunk>,
    tracker: Arc<JobStateTracker>,
    rate_limits: RateLimits,
}

impl ChunkWorker {
    pub fn new(
        base: Stage<ScheduledChunk>,
        worker_index: u16,
        tracker: Arc<JobStateTracker>,
        rate_limits: RateLimits,
    ) -> Self {
        Self {
            worker_index,
            base,
            tracker,
            rate_limits,
        }
    }

    pub async fn run(&self) -> Result<()> {
        trace!(worker_index = self.worker_index, "chunk worker has started.");

        loop {
            tokio::select! {
                biased;

                _ = self.base.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "chunk worker has been cancelled.");
                    return Ok(());
                }
                recv_result = self.base.receiver.as_ref().unwrap().recv() => {
                    match recv_result {
                        Ok(chunk) => {
                            self.process(chunk).await;
                        },
                        Err(_) => {
                            // normal shutdown
                            trace!(worker_index = self.worker_index, "chunk worker has been completed.");
                            break;
                        }
                    }
                },
            }
        }

        Ok(())
    }

    async fn process(&self, chunk: ScheduledChunk) {
        let Some(attempt) = self.tracker.activate(chunk.id) else {
            trace!(
                worker_index = self.worker_index,
                key = chunk.source_key,
                chunk_index = chunk.id.index,
                "chunk is no longer runnable. skipping."
            );
            return;
        };

        let outcome = tokio::select! {
            biased;

            _ = self.base.cancellation_token.cancelled() => ChunkOutcome::Cancelled,
            outcome = self.execute_with_rate_limit(&chunk, attempt) => outcome,
        };

        let result = self.tracker.record_outcome(chunk.id, outcome);
        self.handle_record_result(chunk, attempt, result).await;
    }

    async fn execute_with_rate_limit(&self, chunk: &ScheduledChunk, attempt: u32) -> ChunkOutcome {
        self.rate_limits.acquire(chunk.kind.data_length()).await;

        if self.base.config.dry_run {
            info!(
                worker_index = self.worker_index,
                key = chunk.destination_key,
                chunk_index = chunk.id.index,
                operation = ?chunk.operation,
                "[dry-run] chunk transferred."
            );
            return ChunkOutcome::Completed { bytes: 0 };
        }

        match self.execute(chunk).await {
            Ok(bytes) => {
                if 0 < bytes {
                    self.base
                        .send_stats(TransferStatistics::TransferBytes(bytes))
                        .await;
                }
                ChunkOutcome::Completed { bytes }
            }
            Err(e) => self.classify_failure(chunk, attempt, e),
        }
    }

    async fn execute(&self, chunk: &ScheduledChunk) -> Result<u64> {
        match chunk.kind {
            ChunkKind::Data { offset, length } => {
                let data = self
                    .base
                    .source
                    .as_ref()
                    .unwrap()
                    .read_chunk(&chunk.source_key, offset, length)
                    .await?;
                let bytes = data.len() as u64;

                self.base
                    .target
                    .as_ref()
                    .context("target storage is required for copy.")?
                    .write_chunk(&chunk.destination_key, offset, data, chunk.object_size)
                    .await?;

                Ok(bytes)
            }
            ChunkKind::Properties => {
                let Some(changes) = &chunk.changes else {
                    return Ok(0);
                };

                let storage = if chunk.operation == Operation::Copy {
                    self.base
                        .target
                        .as_ref()
                        .context("target storage is required for copy.")?
                } else {
                    self.base.source.as_ref().unwrap()
                };
                storage
                    .set_properties(&chunk.destination_key, changes)
                    .await?;

                Ok(0)
            }
        }
    }

    fn classify_failure(
        &self,
        chunk: &ScheduledChunk,
        attempt: u32,
        e: anyhow::Error,
    ) -> ChunkOutcome {
        let kind = classify_error(&e);
        let message = format!("{e:#}");
        let failure = FailureInfo {
            kind: Some(kind),
            message: message.clone(),
        };

        if retry::should_retry(&self.base.config.retry_config, kind, attempt) {
            let error = TransferError::TransientTransferError { kind, message }.to_string();
            warn!(
                worker_index = self.worker_index,
                key = chunk.source_key,
                chunk_index = chunk.id.index,
                attempt = attempt,
                error = error,
                "retryable error has occurred."
            );

            return ChunkOutcome::Retry(failure);
        }

        let error = TransferError::TerminalTransferError { kind, message }.to_string();
        error!(
            worker_index = self.worker_index,
            key = chunk.source_key,
            chunk_index = chunk.id.index,
            attempt = attempt,
            error = error,
            source = e.source(),
            "chunk transfer failed."
        );

        ChunkOutcome::Failed(failure)
    }

    async fn handle_record_result(
        &self,
        chunk: ScheduledChunk,
        attempt: u32,
        result: RecordResult,
    ) {
        for released in result.released {
            self.enqueue(released, Duration::ZERO);
        }

        if result.requeue {
            self.base
                .send_stats(TransferStatistics::ChunkRetry {
                    key: chunk.source_key.clone(),
                })
                .await;
            self.enqueue(chunk, retry::backoff(&self.base.config.retry_config, attempt));
        }

        if let Some(finished) = result.finished {
            let stats = match finished.status {
                JobStatus::Completed => TransferStatistics::JobComplete { key: finished.key },
                JobStatus::Failed => TransferStatistics::JobFailed { key: finished.key },
                _ => TransferStatistics::JobCancelled { key: finished.key },
            };
            self.base.send_stats(stats).await;
        }

        if result.drained {
            trace!(worker_index = self.worker_index, "all jobs have finished.");
            self.base.sender.as_ref().unwrap().close();
        }
    }

    /// Puts a chunk back on the queue from a detached task, so that a full queue
    /// never blocks the workers that drain it.
    fn enqueue(&self, chunk: ScheduledChunk, delay: Duration) {
        let sender = self.base.sender.as_ref().unwrap().clone();
        let cancellation_token = self.base.cancellation_token.clone();
        let tracker = self.tracker.clone();

        tokio::spawn(async move {
            let chunk_id = chunk.id;
            let enqueue = async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = sender.send(chunk).await;
            };

            tokio::select! {
                _ = enqueue => {},
                _ = cancellation_token.cancelled() => {
                    tracker.record_outcome(chunk_id, ChunkOutcome::Cancelled);
                }
            }
        });
    }
}
