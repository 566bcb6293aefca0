use crate::Config;
use crate::config::args::value_parser::{
    file_exist, glob_pattern, human_bytes, metadata, storage_path, tagging, tier,
};
use crate::config::{
    FilterConfig, ResumeConfig, RetryConfig, TracingConfig, TransferConfig,
};
use crate::types::PropertyChanges;
use crate::types::job::Operation;
use chrono::{DateTime, Utc};
use clap::Parser;
use clap::builder::{ArgPredicate, NonEmptyStringValueParser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
#[cfg(feature = "version")]
use shadow_rs::shadow;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

mod tests;
pub mod value_parser;

const DEFAULT_WORKER_SIZE: u16 = 16;
const DEFAULT_QUEUE_CAPACITY: u32 = 1000;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_MAX_BACKOFF_MILLISECONDS: u64 = 20000;
const DEFAULT_CHECKPOINT_INTERVAL_MILLISECONDS: u64 = 5000;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_MULTIPART_THRESHOLD: &str = "8MiB";
const DEFAULT_MULTIPART_CHUNKSIZE: &str = "8MiB";
const DEFAULT_WARN_AS_ERROR: bool = false;
const DEFAULT_IGNORE_SYMLINKS: bool = false;
const DEFAULT_RECURSIVE: bool = false;
const DEFAULT_SET_PROPERTIES: bool = false;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_SHOW_NO_PROGRESS: bool = false;

const SOURCE_NOT_FOUND: &str = "SOURCE does not exist\n";
const TARGET_REQUIRED_FOR_COPY: &str = "TARGET is required unless --set-properties is specified\n";
const TARGET_CONFLICTS_WITH_SET_PROPERTIES: &str =
    "with --set-properties, TARGET must not be specified. properties are set on SOURCE in place\n";
const NO_PROPERTY_SPECIFIED: &str =
    "with --set-properties, at least one of --tier, --metadata, --tags must be specified\n";
const TARGET_LOCAL_STORAGE_INVALID: &str = "TARGET is not a valid local path\n";
const SAME_SOURCE_AND_TARGET: &str = "SOURCE and TARGET must be different\n";
const BACKOFF_CONFLICT: &str =
    "--initial-backoff-milliseconds must be smaller than or equal to --max-backoff-milliseconds\n";
const SIZE_FILTER_CONFLICT: &str =
    "--filter-larger-size must be smaller than --filter-smaller-size, otherwise no object matches\n";
const MTIME_FILTER_CONFLICT: &str =
    "--filter-mtime-after must be earlier than --filter-mtime-before, otherwise no object matches\n";

#[cfg(feature = "version")]
shadow!(build);

#[derive(Parser, Clone, Debug)]
#[cfg_attr(feature = "version", command(version=format!("{} ({} {}), {}", build::PKG_VERSION, build::SHORT_COMMIT, build::BUILD_TARGET, build::RUST_VERSION)))]
pub struct CLIArgs {
    #[arg(env, help = "local directory or file to read objects from", value_parser = storage_path::check_storage_path, default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "."), required = false)]
    source: String,

    #[arg(env, help = "local directory to write objects to (omitted with --set-properties)", value_parser = storage_path::check_storage_path)]
    target: Option<String>,

    /// A simulation mode. no actions will be performed
    #[arg(long, env, default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    dry_run: bool,

    /// don't show the progress bar
    #[arg(long, env, default_value_t = DEFAULT_SHOW_NO_PROGRESS, help_heading = "General")]
    show_no_progress: bool,

    /// enumerate all descendants of SOURCE. without this flag, only direct children are processed
    #[arg(short, long, env, default_value_t = DEFAULT_RECURSIVE, help_heading = "General")]
    recursive: bool,

    /// apply --tier/--metadata/--tags to the objects in SOURCE in place instead of copying them
    #[arg(long, env, default_value_t = DEFAULT_SET_PROPERTIES, help_heading = "General")]
    set_properties: bool,

    /// access tier to set. Valid values: Hot, Cool, Cold, Archive
    #[arg(long, env, value_parser = tier::check_tier, help_heading = "Properties")]
    tier: Option<String>,

    /// metadata to set. e.g. "key1=value1;key2=value2". an empty string clears the metadata
    #[arg(long, env, value_parser = metadata::check_metadata, help_heading = "Properties")]
    metadata: Option<String>,

    /// tags to set. e.g. "key1=value1&key2=value2". an empty string clears the tags
    #[arg(long, env, value_parser = tagging::check_tagging, help_heading = "Properties")]
    tags: Option<String>,

    /// process only objects that match one of the given glob patterns separated by ';'.
    /// a pattern without '/' matches the object name, a pattern with '/' matches the relative path
    #[arg(long, env, value_parser = glob_pattern::check_glob_patterns, help_heading = "Filtering")]
    include_pattern: Option<String>,

    /// skip objects that match one of the given glob patterns separated by ';'. exclude wins over include
    #[arg(long, env, value_parser = glob_pattern::check_glob_patterns, help_heading = "Filtering")]
    exclude_pattern: Option<String>,

    /// file that lists relative paths (one per line) of the objects or directories to process
    #[arg(long, env, value_parser = file_exist::is_file_exist, help_heading = "Filtering")]
    list_of_files: Option<String>,

    /// process only objects older than given time (RFC3339 datetime such as 2023-02-19T12:00:00Z)
    #[arg(long, env, help_heading = "Filtering")]
    filter_mtime_before: Option<DateTime<Utc>>,

    /// process only objects newer than OR EQUAL TO given time (RFC3339 datetime such as 2023-02-19T12:00:00Z)
    #[arg(long, env, help_heading = "Filtering")]
    filter_mtime_after: Option<DateTime<Utc>>,

    /// process only objects smaller than given size, Allow suffixes: KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, env, value_parser = human_bytes::check_human_bytes_without_limit, help_heading = "Filtering")]
    filter_smaller_size: Option<String>,

    /// process only objects larger than OR EQUAL TO given size, Allow suffixes: KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, env, value_parser = human_bytes::check_human_bytes_without_limit, help_heading = "Filtering")]
    filter_larger_size: Option<String>,

    /// process only objects whose current access tier equals the given tier
    #[arg(long, env, value_parser = tier::check_tier, help_heading = "Filtering")]
    filter_tier: Option<String>,

    /// number of workers for transfer
    #[arg(long, env, default_value_t = DEFAULT_WORKER_SIZE, value_parser = clap::value_parser!(u16).range(1..), help_heading = "Performance")]
    worker_size: u16,

    /// number of chunks that can wait in the scheduler queue
    #[arg(long, env, default_value_t = DEFAULT_QUEUE_CAPACITY, value_parser = clap::value_parser!(u32).range(1..=1_000_000), help_heading = "Performance")]
    queue_capacity: u32,

    /// rate limit requests per second
    #[arg(long, env, value_parser = clap::value_parser!(u32).range(1..), help_heading = "Performance")]
    rate_limit_objects: Option<u32>,

    /// rate limit bandwidth(bytes per sec). Allow suffixes: KB, KiB, MB, MiB, GB, GiB
    #[arg(long, env, value_parser = human_bytes::check_human_bandwidth, help_heading = "Performance")]
    rate_limit_bandwidth: Option<String>,

    /// object size above which an object is split into chunks, Allow suffixes: KB, KiB, MB, MiB, GB, GiB.
    /// the larger the size, the larger the memory usage.
    #[arg(long, env, default_value = DEFAULT_MULTIPART_THRESHOLD, value_parser = human_bytes::check_human_bytes, help_heading = "Multipart Settings")]
    multipart_threshold: String,

    /// chunk size for objects above the threshold, Allow suffixes: KB, KiB, MB, MiB, GB, GiB.
    /// the larger the size, the larger the memory usage.
    #[arg(long, env, default_value = DEFAULT_MULTIPART_CHUNKSIZE, value_parser = human_bytes::check_human_bytes, help_heading = "Multipart Settings")]
    multipart_chunksize: String,

    /// maximum number of attempts per chunk, including the first one
    #[arg(long, env, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..), help_heading = "Retry Options")]
    max_attempts: u32,

    /// backoff before the second attempt. doubled on every following attempt
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, value_parser = clap::value_parser!(u64).range(0..=60000), help_heading = "Retry Options")]
    initial_backoff_milliseconds: u64,

    /// upper bound of the backoff between attempts
    #[arg(long, env, default_value_t = DEFAULT_MAX_BACKOFF_MILLISECONDS, value_parser = clap::value_parser!(u64).range(0..=3_600_000), help_heading = "Retry Options")]
    max_backoff_milliseconds: u64,

    /// directory to persist resume state to. completed objects recorded there are skipped on the next run
    #[arg(long, env, help_heading = "Resume")]
    resume_state_dir: Option<PathBuf>,

    /// run id used for the resume state file. a new id is generated if omitted
    #[arg(long, env, requires = "resume_state_dir", value_parser = NonEmptyStringValueParser::new(), help_heading = "Resume")]
    run_id: Option<String>,

    /// interval between resume state checkpoints
    #[arg(long, env, default_value_t = DEFAULT_CHECKPOINT_INTERVAL_MILLISECONDS, value_parser = clap::value_parser!(u64).range(100..), help_heading = "Resume")]
    checkpoint_interval_milliseconds: u64,

    /// trace verbosity(-v: show info, -vv: show debug, -vvv show trace)
    #[clap(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// show trace as json format
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing/Logging")]
    json_tracing: bool,

    /// show span event trace
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Tracing/Logging")]
    span_events_tracing: bool,

    /// disable ANSI terminal colors
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Tracing/Logging")]
    disable_color_tracing: bool,

    /// cancel the run when it takes longer than the given seconds
    #[arg(long, env, value_parser = clap::value_parser!(u64).range(1..), help_heading = "Advanced")]
    timeout_seconds: Option<u64>,

    /// treat warnings as errors(e.g. an unreadable sub-directory aborts the run)
    #[arg(long, env, default_value_t = DEFAULT_WARN_AS_ERROR, help_heading = "Advanced")]
    warn_as_error: bool,

    /// ignore symbolic links
    #[arg(long, env, default_value_t = DEFAULT_IGNORE_SYMLINKS, help_heading = "Advanced")]
    ignore_symlinks: bool,

    /// generate a auto completions script. Valid values: bash, fish, zsh, powershell, elvish.
    #[arg(long, env, value_name = "SHELL", value_parser = clap_complete::shells::Shell::from_str, help_heading = "Advanced")]
    auto_complete_shell: Option<clap_complete::shells::Shell>,
}

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    crate::Config::try_from(config_args)
}

impl CLIArgs {
    fn validate_storage_config(&self) -> Result<(), String> {
        if self.auto_complete_shell.is_some() {
            return Ok(());
        }

        self.check_source_local_storage()?;
        self.check_target_local_storage()?;
        self.check_operation_conflict()?;
        self.check_storage_conflict()?;
        self.check_backoff_conflict()?;
        self.check_size_filter_conflict()?;
        self.check_mtime_filter_conflict()?;

        Ok(())
    }

    fn check_source_local_storage(&self) -> Result<(), String> {
        let source = storage_path::parse_storage_path(&self.source)?;

        if !source.exists() {
            return Err(SOURCE_NOT_FOUND.to_string());
        }

        Ok(())
    }

    fn check_target_local_storage(&self) -> Result<(), String> {
        if let Some(target) = &self.target {
            let target = storage_path::parse_storage_path(target)?;
            if target.try_exists().is_err() {
                return Err(TARGET_LOCAL_STORAGE_INVALID.to_string());
            }
        }

        Ok(())
    }

    fn check_operation_conflict(&self) -> Result<(), String> {
        if self.set_properties {
            if self.target.is_some() {
                return Err(TARGET_CONFLICTS_WITH_SET_PROPERTIES.to_string());
            }
            if self.tier.is_none() && self.metadata.is_none() && self.tags.is_none() {
                return Err(NO_PROPERTY_SPECIFIED.to_string());
            }

            return Ok(());
        }

        if self.target.is_none() {
            return Err(TARGET_REQUIRED_FOR_COPY.to_string());
        }

        Ok(())
    }

    fn check_storage_conflict(&self) -> Result<(), String> {
        let Some(target) = &self.target else {
            return Ok(());
        };

        let source = storage_path::parse_storage_path(&self.source)?;
        let target = storage_path::parse_storage_path(target)?;

        let source = source.canonicalize().unwrap_or(source);
        let target = target.canonicalize().unwrap_or(target);
        if source == target {
            return Err(SAME_SOURCE_AND_TARGET.to_string());
        }

        Ok(())
    }

    fn check_backoff_conflict(&self) -> Result<(), String> {
        if self.max_backoff_milliseconds < self.initial_backoff_milliseconds {
            return Err(BACKOFF_CONFLICT.to_string());
        }

        Ok(())
    }

    fn check_size_filter_conflict(&self) -> Result<(), String> {
        if let (Some(larger), Some(smaller)) = (&self.filter_larger_size, &self.filter_smaller_size)
        {
            let larger = human_bytes::parse_human_bytes_without_limit(larger)?;
            let smaller = human_bytes::parse_human_bytes_without_limit(smaller)?;
            if smaller <= larger {
                return Err(SIZE_FILTER_CONFLICT.to_string());
            }
        }

        Ok(())
    }

    fn check_mtime_filter_conflict(&self) -> Result<(), String> {
        if let (Some(after), Some(before)) = (self.filter_mtime_after, self.filter_mtime_before) {
            if before <= after {
                return Err(MTIME_FILTER_CONFLICT.to_string());
            }
        }

        Ok(())
    }

    fn build_property_changes(&self) -> Result<PropertyChanges, String> {
        Ok(PropertyChanges {
            tier: self.tier.as_deref().map(tier::parse_tier).transpose()?,
            metadata: self
                .metadata
                .as_deref()
                .map(metadata::parse_metadata)
                .transpose()?,
            tags: self
                .tags
                .as_deref()
                .map(tagging::parse_tagging)
                .transpose()?,
        })
    }

    fn build_filter_config(&self) -> Result<FilterConfig, String> {
        Ok(FilterConfig {
            include_patterns: self
                .include_pattern
                .as_deref()
                .map(glob_pattern::split_patterns)
                .transpose()?
                .unwrap_or_default(),
            exclude_patterns: self
                .exclude_pattern
                .as_deref()
                .map(glob_pattern::split_patterns)
                .transpose()?
                .unwrap_or_default(),
            list_of_files: self.list_of_files.as_ref().map(PathBuf::from),
            before_time: self.filter_mtime_before,
            after_time: self.filter_mtime_after,
            larger_size: self
                .filter_larger_size
                .as_deref()
                .map(human_bytes::parse_human_bytes_without_limit)
                .transpose()?,
            smaller_size: self
                .filter_smaller_size
                .as_deref()
                .map(human_bytes::parse_human_bytes_without_limit)
                .transpose()?,
            tier: self
                .filter_tier
                .as_deref()
                .map(tier::parse_tier)
                .transpose()?,
        })
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let tracing_config = self
            .verbosity
            .log_level()
            .map(|log_level| TracingConfig {
                tracing_level: log_level,
                json_tracing: self.json_tracing,
                span_events_tracing: self.span_events_tracing,
                disable_color_tracing: self.disable_color_tracing,
            });

        if !self.dry_run {
            return tracing_config;
        }

        // dry-run results are reported through info level traces
        match tracing_config {
            None => Some(TracingConfig {
                tracing_level: log::Level::Info,
                json_tracing: DEFAULT_JSON_TRACING,
                span_events_tracing: DEFAULT_SPAN_EVENTS_TRACING,
                disable_color_tracing: DEFAULT_DISABLE_COLOR_TRACING,
            }),
            Some(config) if config.tracing_level < log::Level::Info => Some(TracingConfig {
                tracing_level: log::Level::Info,
                ..config
            }),
            Some(config) => Some(config),
        }
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(value: CLIArgs) -> Result<Self, Self::Error> {
        value.validate_storage_config()?;

        let operation = if value.set_properties {
            Operation::SetProperties
        } else {
            Operation::Copy
        };

        let rate_limit_bandwidth = value
            .rate_limit_bandwidth
            .as_deref()
            .map(human_bytes::parse_human_bandwidth)
            .transpose()?;

        Ok(Config {
            source: storage_path::parse_storage_path(&value.source)?,
            target: value
                .target
                .as_deref()
                .map(storage_path::parse_storage_path)
                .transpose()?,
            operation,
            property_changes: value.build_property_changes()?,
            recursive: value.recursive,
            worker_size: value.worker_size,
            queue_capacity: value.queue_capacity as usize,
            warn_as_error: value.warn_as_error,
            follow_symlinks: !value.ignore_symlinks,
            dry_run: value.dry_run,
            rate_limit_objects: value.rate_limit_objects,
            rate_limit_bandwidth,
            timeout_seconds: value.timeout_seconds,
            transfer_config: TransferConfig {
                multipart_threshold: human_bytes::parse_human_bytes(&value.multipart_threshold)?,
                multipart_chunksize: human_bytes::parse_human_bytes(&value.multipart_chunksize)?,
            },
            retry_config: RetryConfig {
                max_attempts: value.max_attempts,
                initial_backoff_milliseconds: value.initial_backoff_milliseconds,
                max_backoff_milliseconds: value.max_backoff_milliseconds,
            },
            resume_config: ResumeConfig {
                state_dir: value.resume_state_dir.clone(),
                run_id: value.run_id.clone(),
                checkpoint_interval_milliseconds: value.checkpoint_interval_milliseconds,
            },
            filter_config: value.build_filter_config()?,
            tracing_config: value.build_tracing_config(),
            show_no_progress: value.show_no_progress,
            auto_complete_shell: value.auto_complete_shell,
        })
    }
}
