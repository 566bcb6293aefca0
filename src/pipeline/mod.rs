use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::Config;
use crate::pipeline::dispatcher::JobDispatcher;
use crate::pipeline::filter::{FilterChain, ObjectFilterStage};
use crate::pipeline::lister::ObjectLister;
use crate::pipeline::rate_limit::RateLimits;
use crate::pipeline::scheduler::ChunkWorker;
use crate::pipeline::stage::Stage;
use crate::pipeline::tracker::JobStateTracker;
use crate::pipeline::tracker::resume::{self, ResumeEntry, ResumeStatePersister};
use crate::storage::{Storage, StoragePair};
use crate::types::error::TransferError;
use crate::types::job::{JobStatus, JobSummary, RunOutcome, RunSummary, ScheduledChunk};
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectDescriptor, TransferStatistics};

pub mod dispatcher;
pub mod filter;
mod lister;
pub mod rate_limit;
pub mod scheduler;
mod stage;
mod storage_factory;
pub mod tracker;

/// One run of enumerate, filter, dispatch and transfer.
///
/// Stages are tokio tasks connected by bounded channels. The tracker is the only
/// state shared between the workers.
pub struct Pipeline {
    config: Config,
    source: Storage,
    target: Option<Storage>,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<TransferStatistics>,
    stats_receiver: Receiver<TransferStatistics>,
    tracker: Arc<JobStateTracker>,
    run_id: String,
    has_error: Arc<AtomicBool>,
    has_warning: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<Error>>>,
    ready: bool,
}

impl Pipeline {
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Result<Self> {
        let StoragePair { source, target } =
            storage_factory::create_storage_pair(config.clone(), cancellation_token.clone())
                .await?;

        Ok(Self::with_storage(config, source, target, cancellation_token))
    }

    /// Builds a pipeline over storages created by the caller.
    pub fn with_storage(
        config: Config,
        source: Storage,
        target: Option<Storage>,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let run_id = config
            .resume_config
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            config,
            source,
            target,
            cancellation_token,
            stats_sender,
            stats_receiver,
            tracker: Arc::new(JobStateTracker::new()),
            run_id,
            has_error: Arc::new(AtomicBool::new(false)),
            has_warning: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::<Error>::new())),
            ready: true,
        }
    }

    pub async fn run(&mut self) {
        if !self.ready {
            panic!("it can be executed only once.")
        }
        self.ready = false;

        info!(run_id = self.run_id, "pipeline has started.");

        let completed = match self.load_resume_state() {
            Ok(completed) => completed,
            Err(e) => {
                self.print_and_store_error(e, "failed to load resume state.");
                self.shutdown();
                return;
            }
        };

        let filter_chain =
            match FilterChain::from_config(&self.config.filter_config, self.config.recursive) {
                Ok(filter_chain) => filter_chain,
                Err(e) => {
                    self.print_and_store_error(anyhow!(e), "failed to build filters.");
                    self.shutdown();
                    return;
                }
            };

        let timeout_handle = self.spawn_timeout();
        let persister_stop = CancellationToken::new();
        let persister_handle = self.spawn_persister(persister_stop.clone());

        let mut handles = Vec::new();
        let objects = self.list_source(&mut handles);
        let filtered_objects = self.filter_objects(objects, filter_chain, &mut handles);
        self.transfer(filtered_objects, completed, &mut handles);

        for handle in handles {
            if let Err(e) = handle.await {
                self.print_and_store_error(anyhow!(e), "pipeline task panicked.");
            }
        }

        if let Some(timeout_handle) = timeout_handle {
            timeout_handle.abort();
        }

        self.cancel_pending().await;

        if let Some(persister_handle) = persister_handle {
            persister_stop.cancel();
            match persister_handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.print_and_store_error(e, "failed to save resume state."),
                Err(e) => self.print_and_store_error(anyhow!(e), "resume state persister panicked."),
            }
        }

        self.shutdown();

        let summary = self.tracker.snapshot();
        debug!(
            run_id = self.run_id,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            skipped = summary.skipped,
            "pipeline has been completed."
        );
    }

    fn shutdown(&self) {
        self.close_stats_sender();
    }

    fn load_resume_state(&self) -> Result<BTreeMap<String, ResumeEntry>> {
        let Some(state_dir) = &self.config.resume_config.state_dir else {
            return Ok(BTreeMap::new());
        };

        let path = resume::state_file_path(state_dir, &self.run_id);
        let Some(state) = resume::load(&path)? else {
            return Ok(BTreeMap::new());
        };

        let completed = state
            .objects
            .into_iter()
            .filter(|(_, entry)| entry.status == JobStatus::Completed)
            .collect::<BTreeMap<String, ResumeEntry>>();
        info!(
            run_id = self.run_id,
            completed = completed.len(),
            "resume state has been loaded."
        );

        Ok(completed)
    }

    fn spawn_timeout(&self) -> Option<JoinHandle<()>> {
        let timeout = Duration::from_secs(self.config.timeout_seconds?);
        let cancellation_token = self.cancellation_token.clone();

        Some(tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    warn!(timeout_seconds = timeout.as_secs(), "timeout has been reached. cancelling.");
                    cancellation_token.cancel();
                }
                _ = cancellation_token.cancelled() => {}
            }
        }))
    }

    fn spawn_persister(&self, stop: CancellationToken) -> Option<JoinHandle<Result<()>>> {
        let state_dir = self.config.resume_config.state_dir.as_ref()?;

        let persister = ResumeStatePersister::new(
            self.tracker.clone(),
            resume::state_file_path(state_dir, &self.run_id),
            self.run_id.clone(),
            Duration::from_millis(self.config.resume_config.checkpoint_interval_milliseconds),
        );

        Some(tokio::spawn(async move { persister.persist(stop).await }))
    }

    fn list_source(&self, handles: &mut Vec<JoinHandle<()>>) -> Receiver<ObjectDescriptor> {
        let (stage, next_stage_receiver) = self.create_spsc_stage(None);
        let object_lister = ObjectLister::new(stage);

        handles.push(self.spawn_stage(
            async move { object_lister.list_source().await },
            "list source objects failed.",
        ));

        next_stage_receiver
    }

    fn filter_objects(
        &self,
        objects: Receiver<ObjectDescriptor>,
        filter_chain: FilterChain,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> Receiver<ObjectDescriptor> {
        if filter_chain.is_empty() {
            return objects;
        }

        let (stage, next_stage_receiver) = self.create_spsc_stage(Some(objects));
        let filter = ObjectFilterStage::new(stage, filter_chain);

        handles.push(self.spawn_stage(
            async move { filter.filter().await },
            "filter objects failed.",
        ));
        trace!("ObjectFilterStage has been started.");

        next_stage_receiver
    }

    fn transfer(
        &self,
        objects: Receiver<ObjectDescriptor>,
        completed: BTreeMap<String, ResumeEntry>,
        handles: &mut Vec<JoinHandle<()>>,
    ) {
        let (queue_sender, queue_receiver) =
            async_channel::bounded::<ScheduledChunk>(self.config.queue_capacity);

        let dispatcher_stage = Stage::new(
            self.config.clone(),
            None,
            None,
            Some(objects),
            Some(queue_sender.clone()),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
            self.stats_sender.clone(),
        );
        let dispatcher = JobDispatcher::new(dispatcher_stage, self.tracker.clone(), completed);
        handles.push(self.spawn_stage(
            async move { dispatcher.run().await },
            "dispatch jobs failed.",
        ));

        let rate_limits = RateLimits::from_config(&self.config);
        for worker_index in 0..self.config.worker_size {
            let stage = self.create_mpmc_stage(queue_sender.clone(), queue_receiver.clone());
            let worker = ChunkWorker::new(
                stage,
                worker_index,
                self.tracker.clone(),
                rate_limits.clone(),
            );

            handles.push(self.spawn_stage(
                async move { worker.run().await },
                "chunk worker failed.",
            ));
        }
    }

    /// Runs a stage. A failing stage aborts the whole run.
    fn spawn_stage<F>(&self, stage: F, message: &'static str) -> JoinHandle<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let has_error = self.has_error.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            if let Err(e) = stage.await {
                log_error(has_error, error_list, e, message);
                cancellation_token.cancel();
            }
        })
    }

    async fn cancel_pending(&self) {
        let cancelled = self.tracker.cancel_pending();
        if cancelled.is_empty() {
            return;
        }

        let error = TransferError::SchedulerShutdownError.to_string();
        let cancelled_jobs = cancelled.len();
        warn!(error = error, cancelled_jobs = cancelled_jobs, "pipeline has been shut down.");

        for job in cancelled {
            let _ = self
                .stats_sender
                .send(TransferStatistics::JobCancelled { key: job.key })
                .await;
        }
    }

    fn create_spsc_stage<I, O>(
        &self,
        previous_stage_receiver: Option<Receiver<I>>,
    ) -> (Stage<I, O>, Receiver<O>) {
        let (sender, next_stage_receiver) = async_channel::bounded::<O>(self.config.queue_capacity);
        let stage = Stage::new(
            self.config.clone(),
            Some(dyn_clone::clone_box(&*self.source)),
            self.target
                .as_ref()
                .map(|target| dyn_clone::clone_box(&**target)),
            previous_stage_receiver,
            Some(sender),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
            self.stats_sender.clone(),
        );

        (stage, next_stage_receiver)
    }

    fn create_mpmc_stage<T>(&self, sender: Sender<T>, receiver: Receiver<T>) -> Stage<T> {
        Stage::new(
            self.config.clone(),
            Some(dyn_clone::clone_box(&*self.source)),
            self.target
                .as_ref()
                .map(|target| dyn_clone::clone_box(&**target)),
            Some(receiver),
            Some(sender),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
            self.stats_sender.clone(),
        )
    }

    fn print_and_store_error(&self, e: Error, message: &str) {
        log_error(self.has_error.clone(), self.errors.clone(), e, message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn get_run_summary(&self) -> RunSummary {
        let summary = self.tracker.snapshot();

        RunSummary {
            run_id: self.run_id.clone(),
            outcome: decide_outcome(
                self.has_error(),
                self.cancellation_token.is_cancelled(),
                &summary,
            ),
            summary,
            failures: self.tracker.failures(),
        }
    }

    pub fn get_stats_receiver(&self) -> Receiver<TransferStatistics> {
        self.stats_receiver.clone()
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    pub fn has_warning(&self) -> bool {
        self.has_warning.load(Ordering::SeqCst)
    }

    pub fn get_errors_and_consume(&self) -> Option<Vec<Error>> {
        if !self.has_error() {
            return None;
        }

        let mut error_list = self.errors.lock().unwrap();
        Some(error_list.drain(..).collect())
    }

    pub fn close_stats_sender(&self) {
        self.stats_sender.close();
    }
}

fn decide_outcome(has_error: bool, cancelled: bool, summary: &JobSummary) -> RunOutcome {
    if has_error {
        return RunOutcome::TotalFailure;
    }
    if cancelled {
        return RunOutcome::Cancelled;
    }
    if summary.failed == 0 {
        return RunOutcome::AllSucceeded;
    }
    if summary.completed == 0 {
        return RunOutcome::TotalFailure;
    }

    RunOutcome::PartialFailure
}

fn log_error(
    has_error: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<Error>>>,
    e: Error,
    message: &str,
) {
    has_error.store(true, Ordering::SeqCst);

    let error = e.to_string();
    let source = e.source();

    error!(error = error, source = source, message);

    let mut error_list = errors.lock().unwrap();
    error_list.push_back(e);
}
