use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::pipeline::tracker::JobStateTracker;
use crate::types::job::{JobId, JobStatus};

pub const RESUME_STATE_FORMAT_VERSION: u32 = 1;
const RESUME_STATE_FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeEntry {
    pub job_id: JobId,
    pub status: JobStatus,
    pub attempts: u32,
}

/// Progress of a run, keyed by object key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    pub format_version: u32,
    pub run_id: String,
    pub updated_at: DateTime<Utc>,
    pub objects: BTreeMap<String, ResumeEntry>,
}

impl ResumeState {
    pub fn new(run_id: &str) -> Self {
        Self {
            format_version: RESUME_STATE_FORMAT_VERSION,
            run_id: run_id.to_string(),
            updated_at: Utc::now(),
            objects: BTreeMap::new(),
        }
    }

    pub fn completed_keys(&self) -> HashSet<String> {
        self.objects
            .iter()
            .filter(|(_, entry)| entry.status == JobStatus::Completed)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

pub fn state_file_path(state_dir: &Path, run_id: &str) -> PathBuf {
    state_dir.join(format!("{run_id}.{RESUME_STATE_FILE_EXTENSION}"))
}

/// Loads a previously saved state. A missing file is not an error.
pub fn load(path: &Path) -> Result<Option<ResumeState>> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read resume state: {}", path.display()));
        }
    };

    let state = serde_json::from_slice::<ResumeState>(&content)
        .with_context(|| format!("failed to parse resume state: {}", path.display()))?;
    if state.format_version != RESUME_STATE_FORMAT_VERSION {
        return Err(anyhow!(
            "unsupported resume state format version: {}",
            state.format_version
        ));
    }

    Ok(Some(state))
}

/// Replaces the state file atomically.
pub fn save(path: &Path, state: &ResumeState) -> Result<()> {
    let directory = path
        .parent()
        .context("resume state path has no parent directory.")?;
    std::fs::create_dir_all(directory).context("std::fs::create_dir_all() failed.")?;

    let mut temp_file =
        NamedTempFile::new_in(directory).context("NamedTempFile::new_in failed.")?;
    temp_file
        .write_all(&serde_json::to_vec_pretty(state)?)
        .context("failed to write resume state.")?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .context("NamedTempFile::persist failed.")?;

    let path = path.to_string_lossy().to_string();
    let objects = state.objects.len();
    trace!(path = path, objects = objects, "resume state saved.");

    Ok(())
}

pub struct ResumeStatePersister {
    tracker: Arc<JobStateTracker>,
    path: PathBuf,
    run_id: String,
    interval: Duration,
}

impl ResumeStatePersister {
    pub fn new(
        tracker: Arc<JobStateTracker>,
        path: PathBuf,
        run_id: String,
        interval: Duration,
    ) -> Self {
        Self {
            tracker,
            path,
            run_id,
            interval,
        }
    }

    /// Saves on every interval until `stop` is cancelled, then saves once more.
    pub async fn persist(&self, stop: CancellationToken) -> Result<()> {
        debug!(
            run_id = self.run_id,
            interval_millis = self.interval.as_millis() as u64,
            "resume state persister has started."
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.save().await {
                        let error = e.to_string();
                        warn!(error = error, "failed to save resume state. retrying at next interval.");
                    }
                },
                _ = stop.cancelled() => {
                    break;
                }
            }
        }

        self.save().await?;

        debug!(run_id = self.run_id, "resume state persister has been completed.");
        Ok(())
    }

    /// Snapshots the tracker and writes it off the async workers.
    pub async fn save(&self) -> Result<()> {
        let state = self.tracker.resume_state(&self.run_id);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || save(&path, &state))
            .await
            .context("tokio::task::spawn_blocking() failed.")?
    }
}
