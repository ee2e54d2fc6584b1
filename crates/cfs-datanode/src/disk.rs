//!
//! # Disk
//!
//! A mounted data directory holding partition directories. The disk keeps a
//! registry of the partitions hosted on it without owning them and carries the
//! disk level status that caps every partition status.
//!
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info, warn, error, instrument};

use cfs_storage::PartitionStorage;
use cfs_types::PartitionId;
use cfs_types::defaults::DATA_PARTITION_PREFIX;

use crate::PartitionError;
use crate::context::SharedNodeContext;
use crate::partition::{DataPartition, Partition};
use crate::status::{AtomicStatus, PartitionStatus};

pub type SharedDisk = Arc<Disk>;

pub struct Disk {
    path: PathBuf,
    status: AtomicStatus,
    partitions: RwLock<BTreeMap<PartitionId, Weak<dyn Partition>>>,
}

impl std::fmt::Debug for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Disk")
            .field("path", &self.path)
            .field("status", &self.status.get())
            .field("partitions", &self.partitions.read().len())
            .finish()
    }
}

impl Disk {
    pub fn new(path: impl Into<PathBuf>, status: PartitionStatus) -> Self {
        Self {
            path: path.into(),
            status: AtomicStatus::new(status),
            partitions: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn shared(path: impl Into<PathBuf>, status: PartitionStatus) -> SharedDisk {
        Arc::new(Self::new(path, status))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> PartitionStatus {
        self.status.get()
    }

    pub fn set_status(&self, status: PartitionStatus) {
        info!(path = ?self.path, %status, "disk status changed");
        self.status.set(status);
    }

    /// register partition, replacing any previous entry with same id
    pub fn attach(&self, partition: &Arc<dyn Partition>) {
        let id = partition.id();
        let previous = self
            .partitions
            .write()
            .insert(id, Arc::downgrade(partition));
        if previous.is_some_and(|old| old.strong_count() > 0) {
            warn!(partition = id, "replaced partition already attached to disk");
        }
        debug!(partition = id, path = ?self.path, "attached partition");
    }

    /// remove partition from registry and stop it
    pub fn detach(&self, partition_id: PartitionId) -> Option<Arc<dyn Partition>> {
        let partition = self
            .partitions
            .write()
            .remove(&partition_id)
            .and_then(|weak| weak.upgrade());
        if let Some(partition) = &partition {
            debug!(partition = partition_id, "detached partition");
            partition.stop();
        }
        partition
    }

    pub fn get(&self, partition_id: PartitionId) -> Option<Arc<dyn Partition>> {
        self.partitions
            .read()
            .get(&partition_id)
            .and_then(|weak| weak.upgrade())
    }

    /// live partitions in id order, dropped ones are pruned
    pub fn partitions(&self) -> Vec<Arc<dyn Partition>> {
        let mut registry = self.partitions.write();
        registry.retain(|_, weak| weak.strong_count() > 0);
        registry.values().filter_map(|weak| weak.upgrade()).collect()
    }

    /// stop every live partition and clear registry
    pub fn shutdown(&self) {
        let registry = std::mem::take(&mut *self.partitions.write());
        for (id, weak) in registry {
            if let Some(partition) = weak.upgrade() {
                debug!(partition = id, "stopping partition");
                partition.stop();
            }
        }
        info!(path = ?self.path, "disk shutdown");
    }

    /// load every partition directory found on this disk.
    /// Directories that fail to load are logged and skipped.
    #[instrument(skip(self, ctx), fields(path = ?self.path))]
    pub async fn load_partitions<S>(
        self: &Arc<Self>,
        ctx: &SharedNodeContext,
    ) -> Result<Vec<Arc<DataPartition<S>>>, PartitionError>
    where
        S: PartitionStorage,
    {
        let prefix = format!("{DATA_PARTITION_PREFIX}_");
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect();
        dirs.sort();

        let mut loaded = Vec::with_capacity(dirs.len());
        for dir in dirs {
            match DataPartition::<S>::load(&dir, self.clone(), ctx.clone()).await {
                Ok(partition) => loaded.push(partition),
                Err(err) => error!(?dir, %err, "failed to load partition"),
            }
        }

        info!(count = loaded.len(), "loaded partitions");
        Ok(loaded)
    }
}
