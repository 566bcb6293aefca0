use anyhow::Result;
use tracing::debug;

use super::stage::{SendResult, Stage};
use crate::config::FilterConfig;
pub use crate::pipeline::filter::attribute::{
    LargerSizeFilter, MtimeAfterFilter, MtimeBeforeFilter, SmallerSizeFilter, TierFilter,
};
pub use crate::pipeline::filter::glob::{ExcludePatternFilter, IncludePatternFilter};
pub use crate::pipeline::filter::list_of_files::ListOfFilesFilter;
use crate::types::error::TransferError;
use crate::types::{ObjectDescriptor, TransferStatistics};

mod attribute;
mod glob;
mod list_of_files;

pub trait FilterPredicate: Send + Sync {
    fn name(&self) -> &str;
    fn matches(&self, object: &ObjectDescriptor) -> bool;
}

/// An object passes when every predicate matches.
///
/// Predicates are evaluated in a fixed order: list of files, attributes, include
/// patterns, exclude patterns. An exclude hit always wins over an include hit.
pub struct FilterChain {
    predicates: Vec<Box<dyn FilterPredicate>>,
}

impl FilterChain {
    pub fn from_config(config: &FilterConfig, recursive: bool) -> Result<Self, TransferError> {
        let mut predicates: Vec<Box<dyn FilterPredicate>> = Vec::new();

        if let Some(list_of_files) = &config.list_of_files {
            predicates.push(Box::new(ListOfFilesFilter::from_file(
                list_of_files,
                recursive,
            )?));
        }
        if let Some(larger_size) = config.larger_size {
            predicates.push(Box::new(LargerSizeFilter::new(larger_size)));
        }
        if let Some(smaller_size) = config.smaller_size {
            predicates.push(Box::new(SmallerSizeFilter::new(smaller_size)));
        }
        if let Some(before_time) = config.before_time {
            predicates.push(Box::new(MtimeBeforeFilter::new(before_time)));
        }
        if let Some(after_time) = config.after_time {
            predicates.push(Box::new(MtimeAfterFilter::new(after_time)));
        }
        if let Some(tier) = config.tier {
            predicates.push(Box::new(TierFilter::new(tier)));
        }
        if !config.include_patterns.is_empty() {
            predicates.push(Box::new(IncludePatternFilter::new(
                &config.include_patterns,
            )?));
        }
        if !config.exclude_patterns.is_empty() {
            predicates.push(Box::new(ExcludePatternFilter::new(
                &config.exclude_patterns,
            )?));
        }

        Ok(Self { predicates })
    }

    pub fn new(predicates: Vec<Box<dyn FilterPredicate>>) -> Self {
        Self { predicates }
    }

    pub fn should_include(&self, object: &ObjectDescriptor) -> bool {
        for predicate in &self.predicates {
            if !predicate.matches(object) {
                let name = predicate.name();
                let key = object.key();
                let size = object.size();
                debug!(name = name, key = key, size = size, "object filtered.");

                return false;
            }
        }

        true
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

pub struct ObjectFilterStage {
    base: Stage<ObjectDescriptor>,
    chain: FilterChain,
}

impl ObjectFilterStage {
    pub fn new(base: Stage<ObjectDescriptor>, chain: FilterChain) -> Self {
        Self { base, chain }
    }

    pub async fn filter(&self) -> Result<()> {
        // On x86_64 linux, long running loops starve other tasks under high load.
        loop {
            tokio::task::yield_now().await;
            if self.base.cancellation_token.is_cancelled() {
                debug!("filter has been cancelled.");
                return Ok(());
            }

            match self.base.receiver.as_ref().unwrap().recv().await {
                Ok(object) => {
                    if !self.chain.should_include(&object) {
                        self.base
                            .send_stats(TransferStatistics::ObjectFiltered { key: object.key() })
                            .await;
                        continue;
                    }

                    if self.base.send(object).await? == SendResult::Closed {
                        return Ok(());
                    }
                }
                Err(_) => {
                    debug!("filter has been completed.");
                    return Ok(());
                }
            }
        }
    }
}
