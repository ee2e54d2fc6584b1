//!
//! # Repair merge
//!
//! Applies a repair bundle computed against the authoritative replica to the
//! local stores. Deletes and creates are cheap local edits applied first;
//! size repairs pull the missing bytes from the replica named in each task and
//! run concurrently. Every task is independent: a failed task is logged and
//! retried when the bundle is delivered again.
//!
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use futures_util::future::{join, join_all};
use futures_util::stream::{self, StreamExt};
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn, error, instrument};

use cfs_storage::{BlobStore, ExtentStore, FileInfo, PartitionStorage, StorageError};
use cfs_storage::object::is_blob_file;
use cfs_types::{ExtentId, FileId};

use crate::partition::{DataPartition, Partition};

/// max bytes pulled from a replica per fetch
pub const REPAIR_READ_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Extent,
    Blob,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Extent => write!(f, "extent"),
            Self::Blob => write!(f, "blob"),
        }
    }
}

/// Reads file ranges from another replica of the same partition
#[async_trait]
pub trait RepairFetcher: Send + Sync {
    /// read up to `size` bytes at `offset` of a file held by replica `source`
    async fn fetch(
        &self,
        source: &str,
        kind: StoreKind,
        file_id: FileId,
        offset: u64,
        size: u64,
    ) -> anyhow::Result<Vec<u8>>;
}

#[derive(thiserror::Error, Debug)]
pub enum RepairError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("replica {addr} returned no data for {kind} {file_id} at offset {offset}")]
    NoData {
        addr: String,
        kind: StoreKind,
        file_id: FileId,
        offset: u64,
    },
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

/// Repair tasks for one partition, computed by comparing replicas
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembersFileMetas {
    pub need_add_extents: Vec<FileInfo>,
    pub need_delete_extents: Vec<FileInfo>,
    pub need_fix_extent_size: Vec<FileInfo>,
    pub need_fix_blob_size: Vec<FileInfo>,
    /// blob file id => encoded object ids to delete
    pub need_delete_objects: BTreeMap<FileId, Vec<u8>>,
}

impl MembersFileMetas {
    pub fn is_empty(&self) -> bool {
        self.need_add_extents.is_empty()
            && self.need_delete_extents.is_empty()
            && self.need_fix_extent_size.is_empty()
            && self.need_fix_blob_size.is_empty()
            && self.need_delete_objects.is_empty()
    }
}

impl<S> DataPartition<S>
where
    S: PartitionStorage,
{
    /// converge extent store toward the bundle
    #[instrument(skip(self, metas), fields(partition = self.id()))]
    pub async fn merge_extent_store_repair(&self, metas: MembersFileMetas) {
        let extents = self.storage().extent_store();

        for task in metas
            .need_delete_extents
            .iter()
            .filter(|task| !is_blob_file(task.file_id))
        {
            if let Err(err) = extents.mark_delete(task.file_id as ExtentId).await {
                debug!(file_id = task.file_id, %err, "mark delete skipped");
            }
        }

        let mut fix_tasks = metas.need_fix_extent_size;
        for task in metas
            .need_add_extents
            .into_iter()
            .filter(|task| !is_blob_file(task.file_id))
        {
            let extent_id = task.file_id as ExtentId;
            if extents.is_exist_extent(extent_id).await {
                continue;
            }
            if let Err(err) = extents.create(extent_id, task.inode).await {
                warn!(file_id = task.file_id, %err, "create extent failed");
                continue;
            }
            // new extent is empty, size it up from the task source
            fix_tasks.push(task);
        }

        let mut repairs = Vec::with_capacity(fix_tasks.len());
        for task in fix_tasks
            .into_iter()
            .filter(|task| !is_blob_file(task.file_id))
        {
            if extents.is_exist_extent(task.file_id as ExtentId).await {
                repairs.push(task);
            }
        }

        debug!(tasks = repairs.len(), "dispatching extent size repairs");
        self.run_size_repairs(StoreKind::Extent, &repairs).await;
    }

    /// converge blob store toward the bundle
    #[instrument(skip(self, metas), fields(partition = self.id()))]
    pub async fn merge_blob_store_repair(&self, metas: MembersFileMetas) {
        let repairs: Vec<FileInfo> = metas
            .need_fix_blob_size
            .into_iter()
            .filter(|task| is_blob_file(task.file_id))
            .collect();
        for task in &repairs {
            info!(%task, "received blob repair task");
        }

        let deletes = async {
            for (blobfile_id, delete_buf) in &metas.need_delete_objects {
                if let Err(err) = self.del_objects(*blobfile_id, delete_buf).await {
                    error!(blobfile_id, %err, "delete objects failed");
                }
            }
        };

        join(self.run_size_repairs(StoreKind::Blob, &repairs), deletes).await;
    }

    async fn run_size_repairs(&self, kind: StoreKind, tasks: &[FileInfo]) {
        let repairs = tasks.iter().map(|task| self.repair_file_size(kind, task));
        if let Some(limit) = self.context().config().max_repair_concurrency {
            stream::iter(repairs)
                .buffer_unordered(limit.max(1))
                .for_each(|_| async {})
                .await;
        } else {
            join_all(repairs).await;
        }
    }

    async fn repair_file_size(&self, kind: StoreKind, task: &FileInfo) {
        match self.fix_file_size(kind, task).await {
            Ok(0) => debug!(%kind, file_id = task.file_id, "size already reconciled"),
            Ok(pulled) => info!(%kind, file_id = task.file_id, pulled, "size repaired"),
            Err(err) => warn!(%kind, %task, %err, "size repair failed"),
        }
    }

    /// pull bytes missing locally from the task source, returns bytes written
    async fn fix_file_size(&self, kind: StoreKind, task: &FileInfo) -> Result<u64, RepairError> {
        let file_id = task.file_id;
        let start = self.local_file_size(kind, file_id).await?;
        let mut offset = start;

        while offset < task.size {
            let want = (task.size - offset).min(REPAIR_READ_SIZE);
            let data = self
                .context()
                .fetcher()
                .fetch(&task.source, kind, file_id, offset, want)
                .await?;
            if data.is_empty() {
                return Err(RepairError::NoData {
                    addr: task.source.clone(),
                    kind,
                    file_id,
                    offset,
                });
            }
            let data = &data[..data.len().min(want as usize)];
            self.write_local(kind, file_id, offset, data).await?;
            offset += data.len() as u64;
        }

        Ok(offset - start)
    }

    async fn local_file_size(&self, kind: StoreKind, file_id: FileId) -> Result<u64, StorageError> {
        match kind {
            StoreKind::Extent => {
                self.storage()
                    .extent_store()
                    .extent_size(file_id as ExtentId)
                    .await
            }
            StoreKind::Blob => self.storage().blob_store().blob_file_size(file_id).await,
        }
    }

    async fn write_local(
        &self,
        kind: StoreKind,
        file_id: FileId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StorageError> {
        match kind {
            StoreKind::Extent => {
                self.storage()
                    .extent_store()
                    .write(file_id as ExtentId, offset, data)
                    .await
            }
            StoreKind::Blob => {
                self.storage()
                    .blob_store()
                    .write(file_id, offset, data)
                    .await
            }
        }
    }
}
