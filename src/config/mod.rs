use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::types::job::Operation;
use crate::types::{AccessTier, PropertyChanges};

pub mod args;

#[derive(Debug, Clone)]
pub struct Config {
    pub source: PathBuf,
    pub target: Option<PathBuf>,
    pub operation: Operation,
    pub property_changes: PropertyChanges,
    pub recursive: bool,
    pub worker_size: u16,
    pub queue_capacity: usize,
    pub warn_as_error: bool,
    pub follow_symlinks: bool,
    pub dry_run: bool,
    pub rate_limit_objects: Option<u32>,
    pub rate_limit_bandwidth: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub transfer_config: TransferConfig,
    pub retry_config: RetryConfig,
    pub resume_config: ResumeConfig,
    pub filter_config: FilterConfig,
    pub tracing_config: Option<TracingConfig>,
    pub show_no_progress: bool,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    pub fn is_copy(&self) -> bool {
        self.operation == Operation::Copy
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransferConfig {
    pub multipart_threshold: u64,
    pub multipart_chunksize: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
    pub max_backoff_milliseconds: u64,
}

#[derive(Debug, Clone)]
pub struct ResumeConfig {
    pub state_dir: Option<PathBuf>,
    pub run_id: Option<String>,
    pub checkpoint_interval_milliseconds: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub list_of_files: Option<PathBuf>,
    pub before_time: Option<DateTime<Utc>>,
    pub after_time: Option<DateTime<Utc>>,
    pub larger_size: Option<u64>,
    pub smaller_size: Option<u64>,
    pub tier: Option<AccessTier>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.include_patterns.is_empty()
            && self.exclude_patterns.is_empty()
            && self.list_of_files.is_none()
            && self.before_time.is_none()
            && self.after_time.is_none()
            && self.larger_size.is_none()
            && self.smaller_size.is_none()
            && self.tier.is_none()
    }
}
