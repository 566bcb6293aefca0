use anyhow::Result;

use crate::Config;
use crate::storage::local::LocalStorageFactory;
use crate::storage::{StorageFactory, StoragePair};
use crate::types::token::PipelineCancellationToken;

pub async fn create_storage_pair(
    config: Config,
    cancellation_token: PipelineCancellationToken,
) -> Result<StoragePair> {
    let source = LocalStorageFactory::create(
        config.clone(),
        config.source.clone(),
        cancellation_token.clone(),
    )
    .await?;

    let target = match config.target.clone() {
        Some(target_path) => {
            Some(LocalStorageFactory::create(config.clone(), target_path, cancellation_token).await?)
        }
        None => None,
    };

    Ok(StoragePair { source, target })
}
