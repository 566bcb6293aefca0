use std::path::PathBuf;

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::Config;
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectDescriptor, PropertyChanges};

pub mod local;
pub mod memory;

pub type Storage = Box<dyn StorageTrait + Send + Sync>;

pub struct StoragePair {
    pub source: Storage,
    pub target: Option<Storage>,
}

/// An item produced while enumerating a storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Object(ObjectDescriptor),
    /// A sub-prefix that could not be listed. Siblings are still enumerated.
    PartialFailure { prefix: String, message: String },
}

#[async_trait]
pub trait StorageFactory {
    async fn create(
        config: Config,
        path: PathBuf,
        cancellation_token: PipelineCancellationToken,
    ) -> Result<Storage>;
}

/// Capability set every backend provides. Failures should carry a
/// `types::error::StorageError` so that the scheduler can classify them.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Sends every object below the storage root to `sender`. Returns `Ok` early if the channel is closed.
    async fn list_objects(&self, sender: &Sender<ListEntry>, recursive: bool) -> Result<()>;
    async fn read_chunk(&self, key: &str, offset: u64, length: u64) -> Result<Vec<u8>>;
    async fn write_chunk(&self, key: &str, offset: u64, data: Vec<u8>, object_size: u64)
    -> Result<()>;
    async fn set_properties(&self, key: &str, changes: &PropertyChanges) -> Result<()>;
}
