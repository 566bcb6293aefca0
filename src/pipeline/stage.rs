use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};

use crate::Config;
use crate::storage::Storage;
use crate::types::TransferStatistics;
use crate::types::token::PipelineCancellationToken;

pub struct Stage<I, O = I> {
    pub config: Config,
    pub source: Option<Storage>,
    pub target: Option<Storage>,
    pub receiver: Option<Receiver<I>>,
    pub sender: Option<Sender<O>>,
    pub cancellation_token: PipelineCancellationToken,
    pub has_warning: Arc<AtomicBool>,
    pub stats_sender: Sender<TransferStatistics>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

impl<I, O> Stage<I, O> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        source: Option<Storage>,
        target: Option<Storage>,
        receiver: Option<Receiver<I>>,
        sender: Option<Sender<O>>,
        cancellation_token: PipelineCancellationToken,
        has_warning: Arc<AtomicBool>,
        stats_sender: Sender<TransferStatistics>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            receiver,
            sender,
            cancellation_token,
            has_warning,
            stats_sender,
        }
    }

    pub async fn send(&self, item: O) -> Result<SendResult> {
        let result = self
            .sender
            .as_ref()
            .unwrap()
            .send(item)
            .await
            .map_err(|_| anyhow!("async_channel::Sender::send() failed."));

        if let Err(e) = result {
            return if !self.is_channel_closed() {
                Err(anyhow!(e))
            } else {
                Ok(SendResult::Closed)
            };
        }

        Ok(SendResult::Success)
    }

    pub fn is_channel_closed(&self) -> bool {
        self.sender.as_ref().unwrap().is_closed()
    }

    pub async fn send_stats(&self, stats: TransferStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }

    pub fn set_warning(&self) {
        self.has_warning.store(true, Ordering::SeqCst);
    }
}
