use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::Config;
use crate::storage::{ListEntry, Storage, StorageFactory, StorageTrait};
use crate::types::error::{StorageError, StorageErrorKind, TransferError};
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectDescriptor, PropertyChanges, RelativePath};

pub mod fs_util;

pub struct LocalStorageFactory {}

#[async_trait]
impl StorageFactory for LocalStorageFactory {
    async fn create(
        config: Config,
        path: PathBuf,
        cancellation_token: PipelineCancellationToken,
    ) -> Result<Storage> {
        LocalStorage::create(config, path, cancellation_token).await
    }
}

#[derive(Clone)]
pub struct LocalStorage {
    path: PathBuf,
    object_to_list: Option<String>,
    follow_symlinks: bool,
    cancellation_token: PipelineCancellationToken,
}

impl LocalStorage {
    async fn create(
        config: Config,
        path: PathBuf,
        cancellation_token: PipelineCancellationToken,
    ) -> Result<Storage> {
        let (root, object_to_list) = split_single_file_path(path);

        Ok(Box::new(LocalStorage {
            path: root,
            object_to_list,
            follow_symlinks: config.follow_symlinks,
            cancellation_token,
        }))
    }

    pub fn new(path: PathBuf, follow_symlinks: bool) -> Self {
        let (root, object_to_list) = split_single_file_path(path);

        LocalStorage {
            path: root,
            object_to_list,
            follow_symlinks,
            cancellation_token: crate::types::token::create_pipeline_cancellation_token(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if fs_util::check_directory_traversal(key) {
            return Err(anyhow!(TransferError::DirectoryTraversalError));
        }

        Ok(fs_util::key_to_file_path(&self.path, key))
    }

    fn build_descriptor(&self, relative_path: RelativePath, file_path: &Path) -> Result<ObjectDescriptor> {
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("failed to read metadata: {}", file_path.display()))?;
        let last_modified = fs_util::system_time_to_utc(metadata.modified()?);
        let properties =
            fs_util::load_properties(&fs_util::properties_file_path(&self.path, &relative_path.key()))?;

        Ok(ObjectDescriptor::new(
            relative_path,
            metadata.len(),
            last_modified,
            properties,
        ))
    }

    async fn list_single_object(&self, sender: &Sender<ListEntry>, name: &str) -> Result<()> {
        let relative_path = RelativePath::from_key(name);
        let descriptor = self.build_descriptor(relative_path, &self.path.join(name))?;

        if let Err(e) = sender
            .send(ListEntry::Object(descriptor))
            .await
            .context("async_channel::Sender::send() failed.")
        {
            return if !sender.is_closed() { Err(e) } else { Ok(()) };
        }

        Ok(())
    }

    fn is_object_entry(&self, entry: &DirEntry) -> bool {
        !entry.file_type().is_dir() && !entry.file_type().is_symlink()
    }
}

#[async_trait]
impl StorageTrait for LocalStorage {
    async fn list_objects(&self, sender: &Sender<ListEntry>, recursive: bool) -> Result<()> {
        if let Some(name) = &self.object_to_list {
            return self.list_single_object(sender, name).await;
        }

        // a root that cannot be read fails the listing as a whole
        std::fs::read_dir(&self.path)
            .with_context(|| format!("failed to read directory: {}", self.path.display()))?;

        let max_depth = if recursive { usize::MAX } else { 1 };
        let root = self.path.clone();
        let walker = WalkDir::new(&self.path)
            .follow_links(self.follow_symlinks)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !fs_util::is_reserved_path(&root, entry.path()));

        for entry in walker {
            if self.cancellation_token.is_cancelled() {
                trace!("list() canceled.");
                break;
            }

            let list_entry = match entry {
                Err(e) => {
                    if let Some(inner) = e.io_error() {
                        if inner.kind() == io::ErrorKind::NotFound {
                            continue;
                        }
                    }

                    let prefix = e
                        .path()
                        .and_then(|path| fs_util::relative_path_from(&self.path, path))
                        .map(|path| path.key())
                        .unwrap_or_default();
                    let error = e.to_string();
                    warn!(prefix = prefix, error = error, "failed to list local files.");

                    ListEntry::PartialFailure {
                        prefix,
                        message: error,
                    }
                }
                Ok(entry) => {
                    if !self.is_object_entry(&entry) {
                        continue;
                    }

                    let Some(relative_path) = fs_util::relative_path_from(&self.path, entry.path())
                    else {
                        continue;
                    };

                    match self.build_descriptor(relative_path.clone(), entry.path()) {
                        Ok(descriptor) => ListEntry::Object(descriptor),
                        Err(e) => {
                            let key = relative_path.key();
                            let error = e.to_string();
                            warn!(key = key, error = error, "failed to access file.");

                            ListEntry::PartialFailure {
                                prefix: key,
                                message: error,
                            }
                        }
                    }
                }
            };

            if let Err(e) = sender
                .send(list_entry)
                .await
                .context("async_channel::Sender::send() failed.")
            {
                return if !sender.is_closed() { Err(e) } else { Ok(()) };
            }
        }

        Ok(())
    }

    async fn read_chunk(&self, key: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;

        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open: {}", path.display()))?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer)
            .await
            .with_context(|| format!("failed to read {length} bytes at {offset}: {}", path.display()))?;

        debug!(key = key, offset = offset, length = length, "chunk read.");

        Ok(buffer)
    }

    async fn write_chunk(
        &self,
        key: &str,
        offset: u64,
        data: Vec<u8>,
        object_size: u64,
    ) -> Result<()> {
        let path = self.object_path(key)?;
        if offset + data.len() as u64 > object_size {
            return Err(anyhow!(StorageError::new(
                StorageErrorKind::Malformed,
                format!("chunk exceeds object size. key={key}, offset={offset}"),
            )));
        }

        fs_util::create_parent_directory(&path).await?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .with_context(|| format!("failed to open: {}", path.display()))?;
        if file.metadata().await?.len() != object_size {
            file.set_len(object_size).await?;
        }

        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(key = key, offset = offset, length = data.len(), "chunk written.");

        Ok(())
    }

    async fn set_properties(&self, key: &str, changes: &PropertyChanges) -> Result<()> {
        let path = self.object_path(key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(anyhow!(StorageError::new(
                StorageErrorKind::NotFound,
                format!("object not found: {key}"),
            )));
        }

        let properties_path = fs_util::properties_file_path(&self.path, key);
        let mut properties =
            fs_util::load_properties(&properties_path)?.unwrap_or_default();
        changes.apply_to(&mut properties);
        fs_util::save_properties(&properties_path, &properties)?;

        debug!(key = key, "properties updated.");

        Ok(())
    }
}

fn split_single_file_path(path: PathBuf) -> (PathBuf, Option<String>) {
    if !path.is_file() {
        return (path, None);
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string());
    let mut root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    if root.as_os_str().is_empty() {
        root = PathBuf::from(".");
    }

    (root, name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::AccessTier;

    fn create_test_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data1"), b"12345").unwrap();
        std::fs::create_dir_all(dir.path().join("dir1").join("dir2")).unwrap();
        std::fs::write(dir.path().join("dir1").join("data2"), b"abc").unwrap();
        std::fs::write(dir.path().join("dir1").join("dir2").join("data3"), b"").unwrap();
        dir
    }

    async fn collect(storage: &LocalStorage, recursive: bool) -> Vec<ListEntry> {
        let (sender, receiver) = async_channel::unbounded();
        storage.list_objects(&sender, recursive).await.unwrap();
        sender.close();

        let mut entries = Vec::new();
        while let Ok(entry) = receiver.recv().await {
            entries.push(entry);
        }
        entries
    }

    fn keys(entries: &[ListEntry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|entry| match entry {
                ListEntry::Object(object) => Some(object.key()),
                ListEntry::PartialFailure { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn list_objects_recursive() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let entries = collect(&storage, true).await;
        assert_eq!(keys(&entries), vec!["data1", "dir1/data2", "dir1/dir2/data3"]);

        if let ListEntry::Object(object) = &entries[0] {
            assert_eq!(object.size(), 5);
            assert!(object.properties().is_none());
        }
    }

    #[tokio::test]
    async fn list_objects_flat() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let entries = collect(&storage, false).await;
        assert_eq!(keys(&entries), vec!["data1"]);
    }

    #[tokio::test]
    async fn list_single_file() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();
        let storage = LocalStorage::new(dir.path().join("dir1").join("data2"), true);

        let entries = collect(&storage, true).await;
        assert_eq!(keys(&entries), vec!["data2"]);
    }

    #[tokio::test]
    async fn list_objects_skips_reserved_directory() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);
        storage
            .set_properties(
                "data1",
                &PropertyChanges {
                    tier: Some(AccessTier::Cool),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let entries = collect(&storage, true).await;
        assert_eq!(keys(&entries), vec!["data1", "dir1/data2", "dir1/dir2/data3"]);

        if let ListEntry::Object(object) = &entries[0] {
            assert_eq!(object.tier(), Some(AccessTier::Cool));
        }
    }

    #[tokio::test]
    async fn list_objects_missing_root() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("missing"), true);

        let (sender, _receiver) = async_channel::unbounded();
        assert!(storage.list_objects(&sender, true).await.is_err());
    }

    #[tokio::test]
    #[cfg(target_family = "unix")]
    async fn list_objects_unreadable_sub_directory() {
        use std::os::unix::fs::PermissionsExt;

        init_dummy_tracing_subscriber();

        if nix::unistd::geteuid().is_root() {
            return;
        }

        let dir = create_test_tree();
        let locked = dir.path().join("dir1").join("dir2");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let storage = LocalStorage::new(dir.path().to_path_buf(), true);
        let entries = collect(&storage, true).await;

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(keys(&entries), vec!["data1", "dir1/data2"]);
        assert!(entries.iter().any(|entry| matches!(
            entry,
            ListEntry::PartialFailure { prefix, .. } if prefix == "dir1/dir2"
        )));
    }

    #[tokio::test]
    async fn list_objects_closed_channel() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let (sender, receiver) = async_channel::bounded(1);
        receiver.close();
        storage.list_objects(&sender, true).await.unwrap();
    }

    #[tokio::test]
    async fn write_and_read_chunks() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        storage
            .write_chunk("dir1/data1", 5, b"67890".to_vec(), 12)
            .await
            .unwrap();
        storage
            .write_chunk("dir1/data1", 0, b"12345".to_vec(), 12)
            .await
            .unwrap();
        storage
            .write_chunk("dir1/data1", 10, b"ab".to_vec(), 12)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("dir1").join("data1")).unwrap(),
            b"1234567890ab"
        );
        assert_eq!(storage.read_chunk("dir1/data1", 3, 4).await.unwrap(), b"4567");
    }

    #[tokio::test]
    async fn write_chunk_truncates_existing_file() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data1"), b"a much longer old content").unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        storage
            .write_chunk("data1", 0, b"new".to_vec(), 3)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("data1")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn write_zero_byte_object() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        storage.write_chunk("empty", 0, vec![], 0).await.unwrap();

        assert!(dir.path().join("empty").is_file());
        assert_eq!(std::fs::metadata(dir.path().join("empty")).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn write_chunk_over_object_size() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let e = storage
            .write_chunk("data1", 2, b"123".to_vec(), 4)
            .await
            .unwrap_err();
        assert_eq!(
            crate::types::error::classify_error(&e),
            StorageErrorKind::Malformed
        );
    }

    #[tokio::test]
    async fn read_missing_object() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let e = storage.read_chunk("missing", 0, 1).await.unwrap_err();
        assert_eq!(
            crate::types::error::classify_error(&e),
            StorageErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn directory_traversal_is_rejected() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let e = storage
            .write_chunk("../escape", 0, b"x".to_vec(), 1)
            .await
            .unwrap_err();
        assert_eq!(
            e.downcast_ref::<TransferError>(),
            Some(&TransferError::DirectoryTraversalError)
        );
    }

    #[tokio::test]
    async fn set_properties_merges() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        storage
            .set_properties(
                "dir1/data2",
                &PropertyChanges {
                    tier: Some(AccessTier::Hot),
                    metadata: Some(HashMap::from([("k1".to_string(), "v1".to_string())])),
                    tags: None,
                },
            )
            .await
            .unwrap();
        storage
            .set_properties(
                "dir1/data2",
                &PropertyChanges {
                    tier: Some(AccessTier::Archive),
                    metadata: None,
                    tags: Some(HashMap::from([("t1".to_string(), "v1".to_string())])),
                },
            )
            .await
            .unwrap();

        let properties = fs_util::load_properties(&fs_util::properties_file_path(
            dir.path(),
            "dir1/data2",
        ))
        .unwrap()
        .unwrap();
        assert_eq!(properties.tier, Some(AccessTier::Archive));
        assert_eq!(properties.metadata.get("k1").unwrap(), "v1");
        assert_eq!(properties.tags.get("t1").unwrap(), "v1");
    }

    #[tokio::test]
    async fn set_properties_missing_object() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), true);

        let e = storage
            .set_properties("missing", &PropertyChanges::default())
            .await
            .unwrap_err();
        assert_eq!(
            crate::types::error::classify_error(&e),
            StorageErrorKind::NotFound
        );
    }

    #[test]
    fn split_single_file_path_test() {
        init_dummy_tracing_subscriber();

        let dir = create_test_tree();

        let (root, name) = split_single_file_path(dir.path().join("data1"));
        assert_eq!(root, dir.path());
        assert_eq!(name.unwrap(), "data1");

        let (root, name) = split_single_file_path(dir.path().to_path_buf());
        assert_eq!(root, dir.path());
        assert!(name.is_none());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
