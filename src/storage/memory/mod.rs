use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::storage::{ListEntry, StorageTrait};
use crate::types::error::{StorageError, StorageErrorKind};
use crate::types::{ObjectDescriptor, PropertyBag, PropertyChanges, RelativePath};

/// Storage calls that can be observed and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    ReadChunk,
    WriteChunk,
    SetProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryObject {
    pub data: Vec<u8>,
    pub last_modified: DateTime<Utc>,
    pub properties: Option<PropertyBag>,
}

#[derive(Debug, Clone)]
struct InjectedFault {
    kind: StorageErrorKind,
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<String, MemoryObject>,
    faults: HashMap<(StorageOperation, String), InjectedFault>,
    listing_failures: Vec<(String, String)>,
    listing_error: Option<StorageErrorKind>,
    duplicate_listing: bool,
    latency: Option<Duration>,
    call_counts: HashMap<(StorageOperation, String), u32>,
}

/// In-process object store.
///
/// Clones share the same objects, so a test can keep one handle and give another
/// to a pipeline. Faults can be injected per operation and key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, key: &str, data: Vec<u8>) {
        self.put_object_with_properties(key, data, None);
    }

    pub fn put_object_with_properties(
        &self,
        key: &str,
        data: Vec<u8>,
        properties: Option<PropertyBag>,
    ) {
        self.put_object_with_last_modified(key, data, Utc::now(), properties);
    }

    pub fn put_object_with_last_modified(
        &self,
        key: &str,
        data: Vec<u8>,
        last_modified: DateTime<Utc>,
        properties: Option<PropertyBag>,
    ) {
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            MemoryObject {
                data,
                last_modified,
                properties,
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Makes `operation` on `key` fail with `kind`. `times` of `None` fails forever.
    pub fn inject_fault(
        &self,
        operation: StorageOperation,
        key: &str,
        kind: StorageErrorKind,
        times: Option<u32>,
    ) {
        self.state.lock().unwrap().faults.insert(
            (operation, key.to_string()),
            InjectedFault {
                kind,
                remaining: times,
            },
        );
    }

    /// Reports `prefix` as unlistable. Objects below it are not enumerated.
    pub fn inject_listing_failure(&self, prefix: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .listing_failures
            .push((prefix.to_string(), message.to_string()));
    }

    pub fn fail_listing(&self, kind: StorageErrorKind) {
        self.state.lock().unwrap().listing_error = Some(kind);
    }

    /// Reports every object twice while listing.
    pub fn set_duplicate_listing(&self, duplicate: bool) {
        self.state.lock().unwrap().duplicate_listing = duplicate;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    pub fn call_count(&self, operation: StorageOperation, key: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .call_counts
            .get(&(operation, key.to_string()))
            .copied()
            .unwrap_or_default()
    }

    async fn begin_call(&self, operation: StorageOperation, key: &str) -> Result<()> {
        let (latency, fault) = {
            let mut state = self.state.lock().unwrap();
            *state
                .call_counts
                .entry((operation, key.to_string()))
                .or_default() += 1;

            let fault = match state.faults.get_mut(&(operation, key.to_string())) {
                Some(fault) if fault.remaining != Some(0) => {
                    if let Some(remaining) = fault.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    Some(fault.kind)
                }
                _ => None,
            };

            (state.latency, fault)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(kind) = fault {
            debug!(key = key, kind = kind.to_string(), "injected fault.");
            return Err(anyhow!(StorageError::new(
                kind,
                format!("injected {kind} fault. key={key}"),
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl StorageTrait for MemoryStorage {
    async fn list_objects(&self, sender: &Sender<ListEntry>, recursive: bool) -> Result<()> {
        let entries = {
            let state = self.state.lock().unwrap();
            if let Some(kind) = state.listing_error {
                return Err(anyhow!(StorageError::new(kind, "listing failed.")));
            }

            let is_under_failing_prefix = |key: &str| {
                state
                    .listing_failures
                    .iter()
                    .any(|(prefix, _)| key.starts_with(&format!("{prefix}/")))
            };

            let mut entries = state
                .listing_failures
                .iter()
                .map(|(prefix, message)| ListEntry::PartialFailure {
                    prefix: prefix.clone(),
                    message: message.clone(),
                })
                .collect::<Vec<ListEntry>>();

            for (key, object) in state.objects.iter() {
                if !recursive && key.contains('/') {
                    continue;
                }
                if is_under_failing_prefix(key) {
                    continue;
                }

                let entry = ListEntry::Object(ObjectDescriptor::new(
                    RelativePath::from_key(key),
                    object.data.len() as u64,
                    object.last_modified,
                    object.properties.clone(),
                ));
                if state.duplicate_listing {
                    entries.push(entry.clone());
                }
                entries.push(entry);
            }

            entries
        };

        for entry in entries {
            if let Err(e) = sender
                .send(entry)
                .await
                .context("async_channel::Sender::send() failed.")
            {
                return if !sender.is_closed() { Err(e) } else { Ok(()) };
            }
        }

        trace!("memory storage listing has been completed.");

        Ok(())
    }

    async fn read_chunk(&self, key: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.begin_call(StorageOperation::ReadChunk, key).await?;

        let state = self.state.lock().unwrap();
        let object = state.objects.get(key).ok_or_else(|| {
            anyhow!(StorageError::new(
                StorageErrorKind::NotFound,
                format!("object not found: {key}"),
            ))
        })?;

        let start = offset as usize;
        let end = start + length as usize;
        if end > object.data.len() {
            return Err(anyhow!(StorageError::new(
                StorageErrorKind::Malformed,
                format!("range out of bounds. key={key}, offset={offset}, length={length}"),
            )));
        }

        Ok(object.data[start..end].to_vec())
    }

    async fn write_chunk(
        &self,
        key: &str,
        offset: u64,
        data: Vec<u8>,
        object_size: u64,
    ) -> Result<()> {
        self.begin_call(StorageOperation::WriteChunk, key).await?;

        let start = offset as usize;
        let end = start + data.len();
        if end as u64 > object_size {
            return Err(anyhow!(StorageError::new(
                StorageErrorKind::Malformed,
                format!("chunk exceeds object size. key={key}, offset={offset}"),
            )));
        }

        let mut state = self.state.lock().unwrap();
        let object = state
            .objects
            .entry(key.to_string())
            .or_insert_with(|| MemoryObject {
                data: Vec::new(),
                last_modified: Utc::now(),
                properties: None,
            });
        object.data.resize(object_size as usize, 0);
        object.data[start..end].copy_from_slice(&data);
        object.last_modified = Utc::now();

        Ok(())
    }

    async fn set_properties(&self, key: &str, changes: &PropertyChanges) -> Result<()> {
        self.begin_call(StorageOperation::SetProperties, key).await?;

        let mut state = self.state.lock().unwrap();
        let object = state.objects.get_mut(key).ok_or_else(|| {
            anyhow!(StorageError::new(
                StorageErrorKind::NotFound,
                format!("object not found: {key}"),
            ))
        })?;

        let mut properties = object.properties.take().unwrap_or_default();
        changes.apply_to(&mut properties);
        object.properties = Some(properties);

        Ok(())
    }
}
