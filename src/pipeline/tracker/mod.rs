use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, trace};

use crate::pipeline::tracker::resume::{ResumeEntry, ResumeState};
use crate::types::job::{
    ChunkId, ChunkKind, ChunkStatus, FailedObject, FailureInfo, JobId, JobStatus, JobSummary,
    ScheduledChunk, TransferJob,
};

pub mod resume;

/// Result of executing one chunk attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Completed { bytes: u64 },
    /// Retryable failure. The chunk goes back to Queued.
    Retry(FailureInfo),
    Failed(FailureInfo),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishedJob {
    pub id: JobId,
    pub key: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordResult {
    /// `false` when the chunk was already terminal or unknown.
    pub applied: bool,
    /// Set for an applied `Retry` when the chunk should be queued again.
    pub requeue: bool,
    /// Chunks that became runnable because of this outcome.
    pub released: Vec<ScheduledChunk>,
    pub finished: Option<FinishedJob>,
    /// The dispatcher is done and every job is terminal.
    pub drained: bool,
}

#[derive(Debug, Default)]
struct TrackerState {
    jobs: HashMap<JobId, TransferJob>,
    failing: HashMap<JobId, bool>,
    outstanding: usize,
    sealed: bool,
    skipped: BTreeMap<String, ResumeEntry>,
    transferred_bytes: u64,
    next_job_id: JobId,
}

impl TrackerState {
    fn is_drained(&self) -> bool {
        self.sealed && self.outstanding == 0
    }

    /// Moves a job to a terminal status once none of its chunks can run any more.
    fn settle(&mut self, job_id: JobId) -> Option<FinishedJob> {
        let failing = self.failing.get(&job_id).copied().unwrap_or_default();
        let job = self.jobs.get_mut(&job_id)?;

        if job.status.is_terminal() || !job.chunks.iter().all(|chunk| chunk.status.is_terminal()) {
            return None;
        }

        let status = if failing
            || job
                .chunks
                .iter()
                .any(|chunk| chunk.status == ChunkStatus::Failed)
        {
            JobStatus::Failed
        } else if job
            .chunks
            .iter()
            .all(|chunk| chunk.status == ChunkStatus::Completed)
        {
            JobStatus::Completed
        } else {
            JobStatus::Cancelled
        };

        job.status = status;
        job.completed_at = Some(Utc::now());
        job.chunks.clear();

        self.failing.remove(&job_id);
        self.outstanding -= 1;

        let key = job.source_key();
        debug!(job_id = job_id, key = key, status = ?status, "job has finished.");

        Some(FinishedJob {
            id: job_id,
            key,
            status,
        })
    }
}

/// Authoritative status of every job and chunk of a run.
///
/// All mutation goes through one mutex, so readers never observe a half updated job.
#[derive(Debug, Default)]
pub struct JobStateTracker {
    state: Mutex<TrackerState>,
}

impl JobStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_job_id(&self) -> JobId {
        let mut state = self.state.lock().unwrap();
        state.next_job_id += 1;
        state.next_job_id
    }

    /// Adds a job and returns the chunks that may run right away.
    ///
    /// A trailing `Properties` chunk of a job that also has data chunks is held
    /// back until every data chunk has completed.
    pub fn register(&self, job: TransferJob) -> Vec<ScheduledChunk> {
        let has_data = job
            .chunks
            .iter()
            .any(|chunk| matches!(chunk.kind, ChunkKind::Data { .. }));
        let released = job
            .chunks
            .iter()
            .filter(|chunk| !has_data || matches!(chunk.kind, ChunkKind::Data { .. }))
            .map(|chunk| job.schedule(chunk))
            .collect::<Vec<ScheduledChunk>>();

        let mut state = self.state.lock().unwrap();
        trace!(job_id = job.id, chunks = job.chunks.len(), "job registered.");
        state.outstanding += 1;
        state.jobs.insert(job.id, job);

        released
    }

    /// Marks a queued chunk Active. Returns its attempt number, or `None` if the
    /// chunk must not run (cancelled, already terminal or unknown).
    pub fn activate(&self, chunk_id: ChunkId) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        let job = state.jobs.get_mut(&chunk_id.job_id)?;
        if job.status.is_terminal() {
            return None;
        }

        let chunk = job
            .chunks
            .iter_mut()
            .find(|chunk| chunk.id == chunk_id)?;
        if chunk.status != ChunkStatus::Queued {
            return None;
        }

        chunk.status = ChunkStatus::Active;
        chunk.attempts += 1;
        let attempts = chunk.attempts;

        job.attempts += 1;
        job.status = JobStatus::Active;

        Some(attempts)
    }

    /// Applies the outcome of a chunk attempt. Outcomes for a terminal chunk are ignored.
    pub fn record_outcome(&self, chunk_id: ChunkId, outcome: ChunkOutcome) -> RecordResult {
        let mut state = self.state.lock().unwrap();
        let job_id = chunk_id.job_id;
        let failing = state.failing.get(&job_id).copied().unwrap_or_default();

        let Some(job) = state.jobs.get_mut(&job_id) else {
            return RecordResult::default();
        };
        if job.status.is_terminal() {
            return RecordResult::default();
        }
        let Some(index) = job.chunks.iter().position(|chunk| chunk.id == chunk_id) else {
            return RecordResult::default();
        };
        if job.chunks[index].status.is_terminal() {
            return RecordResult::default();
        }

        let mut result = RecordResult {
            applied: true,
            ..Default::default()
        };

        match outcome {
            ChunkOutcome::Completed { bytes } => {
                job.chunks[index].status = ChunkStatus::Completed;

                let data_completed = job
                    .chunks
                    .iter()
                    .filter(|chunk| matches!(chunk.kind, ChunkKind::Data { .. }))
                    .all(|chunk| chunk.status == ChunkStatus::Completed);
                if data_completed && matches!(job.chunks[index].kind, ChunkKind::Data { .. }) {
                    result.released = job
                        .chunks
                        .iter()
                        .filter(|chunk| {
                            chunk.kind == ChunkKind::Properties
                                && chunk.status == ChunkStatus::Queued
                        })
                        .map(|chunk| job.schedule(chunk))
                        .collect();
                }

                state.transferred_bytes += bytes;
            }
            ChunkOutcome::Retry(failure) => {
                job.last_failure = Some(failure);
                if failing {
                    job.chunks[index].status = ChunkStatus::Cancelled;
                } else {
                    job.chunks[index].status = ChunkStatus::Queued;
                    result.requeue = true;
                }
            }
            ChunkOutcome::Failed(failure) => {
                job.chunks[index].status = ChunkStatus::Failed;
                job.last_failure = Some(failure);

                for chunk in job.chunks.iter_mut() {
                    if chunk.status == ChunkStatus::Queued {
                        chunk.status = ChunkStatus::Cancelled;
                    }
                }
                state.failing.insert(job_id, true);
            }
            ChunkOutcome::Cancelled => {
                job.chunks[index].status = ChunkStatus::Cancelled;
            }
        }

        result.finished = state.settle(job_id);
        result.drained = state.is_drained();

        result
    }

    /// Called once no more jobs will be registered. Returns whether the run is drained.
    pub fn seal(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.sealed = true;
        state.is_drained()
    }

    pub fn is_drained(&self) -> bool {
        self.state.lock().unwrap().is_drained()
    }

    /// Cancels every chunk that has not reached a terminal status and settles its job.
    pub fn cancel_pending(&self) -> Vec<FinishedJob> {
        let mut state = self.state.lock().unwrap();

        let pending = state
            .jobs
            .iter()
            .filter(|(_, job)| !job.status.is_terminal())
            .map(|(id, _)| *id)
            .collect::<Vec<JobId>>();

        let mut finished = Vec::new();
        for job_id in pending {
            if let Some(job) = state.jobs.get_mut(&job_id) {
                for chunk in job.chunks.iter_mut() {
                    if !chunk.status.is_terminal() {
                        chunk.status = ChunkStatus::Cancelled;
                    }
                }
            }
            if let Some(job) = state.settle(job_id) {
                finished.push(job);
            }
        }

        finished
    }

    /// Carries a job completed by an earlier run into this run's state.
    pub fn record_skip(&self, key: &str, entry: ResumeEntry) {
        self.state
            .lock()
            .unwrap()
            .skipped
            .insert(key.to_string(), entry);
    }

    pub fn snapshot(&self) -> JobSummary {
        let state = self.state.lock().unwrap();

        let mut summary = JobSummary {
            skipped: state.skipped.len() as u64,
            transferred_bytes: state.transferred_bytes,
            ..Default::default()
        };
        for job in state.jobs.values() {
            match job.status {
                JobStatus::Queued => summary.queued += 1,
                JobStatus::Active => summary.active += 1,
                JobStatus::Completed => summary.completed += 1,
                JobStatus::Failed => summary.failed += 1,
                JobStatus::Cancelled => summary.cancelled += 1,
            }
        }

        summary
    }

    pub fn failures(&self) -> Vec<FailedObject> {
        let state = self.state.lock().unwrap();

        let mut failures = state
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Failed)
            .map(|job| FailedObject {
                key: job.source_key(),
                kind: job.last_failure.as_ref().and_then(|failure| failure.kind),
                message: job
                    .last_failure
                    .as_ref()
                    .map(|failure| failure.message.clone())
                    .unwrap_or_default(),
            })
            .collect::<Vec<FailedObject>>();
        failures.sort_by(|a, b| a.key.cmp(&b.key));

        failures
    }

    pub fn job(&self, job_id: JobId) -> Option<TransferJob> {
        self.state.lock().unwrap().jobs.get(&job_id).cloned()
    }

    pub fn resume_state(&self, run_id: &str) -> ResumeState {
        let state = self.state.lock().unwrap();

        let mut resume_state = ResumeState::new(run_id);
        resume_state.objects = state.skipped.clone();
        for job in state.jobs.values() {
            resume_state.objects.insert(
                job.source_key(),
                ResumeEntry {
                    job_id: job.id,
                    status: job.status,
                    attempts: job.attempts,
                },
            );
        }

        resume_state
    }
}
