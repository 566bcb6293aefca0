#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_channel::Receiver;
use once_cell::sync::Lazy;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use xferjob::Config;
use xferjob::config::args::parse_from_args;
use xferjob::pipeline::Pipeline;
use xferjob::storage::local::fs_util;
use xferjob::types::token::create_pipeline_cancellation_token;
use xferjob::types::{PropertyBag, TransferStatistics};

pub const LARGE_FILE_SIZE: usize = 30 * 1024 * 1024 + 123;

pub static SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(1)));

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StatsCount {
    pub transferred_bytes: u64,
    pub complete: u64,
    pub skip: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub warning: u64,
    pub retry: u64,
    pub filtered: u64,
}

pub struct TestHelper;

impl TestHelper {
    pub fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }

    /// Creates `files` below `root`. Parent directories are created as needed.
    pub fn create_tree(root: &Path, files: &[(&str, &[u8])]) {
        for (key, content) in files {
            let path = root.join(key);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
    }

    pub fn create_large_file(root: &Path, key: &str) -> Vec<u8> {
        let content = (0..LARGE_FILE_SIZE)
            .map(|i| (i % 251) as u8)
            .collect::<Vec<u8>>();
        Self::create_tree(root, &[(key, &content)]);

        content
    }

    /// Relative keys of every regular file below `root`, the reserved directory excluded.
    pub fn list_keys(root: &Path) -> Vec<String> {
        let mut keys = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != fs_util::RESERVED_DIRECTORY_NAME)
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .unwrap()
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<String>>()
                    .join("/")
            })
            .collect::<Vec<String>>();
        keys.sort();

        keys
    }

    pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
        Self::list_keys(root)
            .into_iter()
            .map(|key| {
                let content = std::fs::read(fs_util::key_to_file_path(root, &key)).unwrap();
                (key, content)
            })
            .collect()
    }

    pub fn read_properties(root: &Path, key: &str) -> Option<PropertyBag> {
        fs_util::load_properties(&fs_util::properties_file_path(root, key)).unwrap()
    }

    pub fn build_config(args: Vec<String>) -> Config {
        let mut all_args = vec!["xferjob".to_string()];
        all_args.extend(args);

        Config::try_from(parse_from_args(all_args).unwrap()).unwrap()
    }

    pub fn path_arg(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    pub async fn run_pipeline(config: Config) -> (Pipeline, StatsCount) {
        let mut pipeline = Pipeline::new(config, create_pipeline_cancellation_token())
            .await
            .unwrap();
        let stats_receiver = pipeline.get_stats_receiver();

        pipeline.run().await;

        (pipeline, Self::count_stats(stats_receiver))
    }

    pub fn count_stats(stats_receiver: Receiver<TransferStatistics>) -> StatsCount {
        let mut count = StatsCount::default();

        while let Ok(stats) = stats_receiver.try_recv() {
            match stats {
                TransferStatistics::TransferBytes(size) => count.transferred_bytes += size,
                TransferStatistics::JobComplete { .. } => count.complete += 1,
                TransferStatistics::JobSkip { .. } => count.skip += 1,
                TransferStatistics::JobFailed { .. } => count.failed += 1,
                TransferStatistics::JobCancelled { .. } => count.cancelled += 1,
                TransferStatistics::JobWarning { .. } => count.warning += 1,
                TransferStatistics::ChunkRetry { .. } => count.retry += 1,
                TransferStatistics::ObjectFiltered { .. } => count.filtered += 1,
            }
        }

        count
    }

    pub fn state_dir(root: &Path) -> PathBuf {
        let state_dir = root.join("state");
        std::fs::create_dir_all(&state_dir).unwrap();

        state_dir
    }
}
