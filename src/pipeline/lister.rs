use std::collections::HashSet;

use anyhow::{Result, anyhow};
use async_channel::Receiver;
use tracing::{debug, trace, warn};

use super::stage::{SendResult, Stage};
use crate::storage::ListEntry;
use crate::types::error::TransferError;
use crate::types::{ObjectDescriptor, TransferStatistics};

const LIST_CHANNEL_CAPACITY: usize = 1000;

pub struct ObjectLister {
    base: Stage<ObjectDescriptor>,
}

impl ObjectLister {
    pub fn new(base: Stage<ObjectDescriptor>) -> Self {
        Self { base }
    }

    pub async fn list_source(&self) -> Result<()> {
        trace!("list source objects has started.");

        let (sender, receiver) = async_channel::bounded::<ListEntry>(LIST_CHANNEL_CAPACITY);
        let source = self.base.source.as_ref().unwrap();
        // listed entries may be nested, so a list of files walks the whole source
        let recursive = self.base.config.recursive
            || self.base.config.filter_config.list_of_files.is_some();

        let list = async {
            let result = source.list_objects(&sender, recursive).await;
            sender.close();
            result
        };
        let (list_result, forward_result) = tokio::join!(list, self.forward(receiver));

        if let Err(e) = list_result {
            return Err(anyhow!(TransferError::EnumerationError(format!("{e:#}"))));
        }
        forward_result?;

        trace!("list source objects has been completed.");
        Ok(())
    }

    async fn forward(&self, receiver: Receiver<ListEntry>) -> Result<()> {
        let result = self.receive_and_forward(&receiver).await;

        // unblocks the listing when this side stops early
        receiver.close();

        result
    }

    async fn receive_and_forward(&self, receiver: &Receiver<ListEntry>) -> Result<()> {
        let mut seen_keys = HashSet::new();

        while let Ok(entry) = receiver.recv().await {
            if self.base.cancellation_token.is_cancelled() {
                debug!("list source objects has been cancelled.");
                return Ok(());
            }

            match entry {
                ListEntry::Object(object) => {
                    let key = object.key();
                    if !seen_keys.insert(key.clone()) {
                        debug!(key = key, "duplicate object skipped.");
                        continue;
                    }

                    if self.base.send(object).await? == SendResult::Closed {
                        return Ok(());
                    }
                }
                ListEntry::PartialFailure { prefix, message } => {
                    self.base.set_warning();
                    self.base
                        .send_stats(TransferStatistics::JobWarning {
                            key: prefix.clone(),
                        })
                        .await;
                    warn!(
                        prefix = prefix,
                        error = message,
                        "failed to list a part of the source."
                    );

                    if self.base.config.warn_as_error {
                        return Err(anyhow!(TransferError::EnumerationError(format!(
                            "{prefix}: {message}"
                        ))));
                    }
                }
            }
        }

        Ok(())
    }
}
