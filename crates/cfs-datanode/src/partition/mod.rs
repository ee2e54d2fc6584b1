mod scheduler;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Buf;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn, error, trace, instrument};

use cfs_storage::{
    BlobStore, ExtentFilter, ExtentStore, FileInfo, Object, PartitionStorage, OBJECT_HEADER_SIZE,
    OBJECT_ID_LEN,
};
use cfs_types::{FileId, HostAddr, ObjectId, PartitionId};
use cfs_types::defaults::DATA_PARTITION_PREFIX;
use cfs_types::event::{SharedStopSignal, StopSignal};

use crate::PartitionError;
use crate::context::{NodeContext, SharedNodeContext};
use crate::disk::SharedDisk;
use crate::membership::{is_leader_host, replica_hosts_equal};
use crate::meta::PartitionMeta;
use crate::metrics::PartitionMetrics;
use crate::status::{AtomicStatus, PartitionStatus};

use self::scheduler::PartitionScheduler;

const ORDER: Ordering = Ordering::SeqCst;

/// directory name of a partition under its disk
pub fn partition_dir_name(partition_id: PartitionId, size: u64) -> String {
    format!("{DATA_PARTITION_PREFIX}_{partition_id}_{size}")
}

/// Partition as seen by its disk and the node
pub trait Partition: Send + Sync {
    fn id(&self) -> PartitionId;

    fn path(&self) -> &Path;

    fn is_leader(&self) -> bool;

    fn replica_hosts(&self) -> Vec<HostAddr>;

    /// capacity in bytes
    fn size(&self) -> u64;

    /// bytes used as of last status update
    fn used(&self) -> u64;

    fn available(&self) -> u64 {
        self.size().saturating_sub(self.used())
    }

    fn status(&self) -> PartitionStatus;

    /// set status from wire code, unknown codes are ignored
    fn change_status(&self, code: i8);

    /// fire stop signal and close stores
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Success,
    Failed,
}

/// Partition state reported to the metadata authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPartitionResponse {
    pub partition_id: PartitionId,
    pub status: PartitionStatus,
    pub used: u64,
    /// extent files followed by blob files
    pub snapshot: Vec<FileInfo>,
    pub task_status: TaskStatus,
    pub result: String,
}

/// decode delete buffer into object ids, in buffer order
pub fn decode_object_ids(delete_buf: &[u8]) -> Result<Vec<ObjectId>, PartitionError> {
    if delete_buf.len() % OBJECT_ID_LEN != 0 {
        return Err(PartitionError::InvalidDeleteBuffer {
            len: delete_buf.len(),
        });
    }
    let mut src = delete_buf;
    let mut oids = Vec::with_capacity(delete_buf.len() / OBJECT_ID_LEN);
    while src.has_remaining() {
        oids.push(src.get_u64());
    }
    Ok(oids)
}

/// One replicated data partition hosted on a disk
pub struct DataPartition<S> {
    meta: PartitionMeta,
    path: PathBuf,
    used: AtomicU64,
    status: AtomicStatus,
    is_leader: AtomicBool,
    replica_hosts: RwLock<Vec<HostAddr>>,
    disk: SharedDisk,
    storage: S,
    metrics: PartitionMetrics,
    stop: SharedStopSignal,
    ctx: SharedNodeContext,
}

impl<S> fmt::Debug for DataPartition<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DataPartition")
            .field("id", &self.meta.partition_id)
            .field("volume_id", &self.meta.volume_id)
            .field("path", &self.path)
            .field("status", &self.status.get())
            .field("is_leader", &self.is_leader.load(ORDER))
            .finish()
    }
}

impl<S> fmt::Display for DataPartition<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            partition_dir_name(self.meta.partition_id, self.meta.partition_size)
        )
    }
}

impl<S> DataPartition<S>
where
    S: PartitionStorage,
{
    /// create new partition on disk, write its meta file and start it
    #[instrument(skip(disk, ctx))]
    pub async fn create(
        volume_id: &str,
        partition_id: PartitionId,
        disk: SharedDisk,
        size: u64,
        partition_type: &str,
        ctx: SharedNodeContext,
    ) -> Result<Arc<Self>, PartitionError> {
        let mut meta = PartitionMeta::new(volume_id, partition_id, size, partition_type);
        meta.validate()?;

        let partition = Self::open(meta, disk, ctx).await?;
        if let Err(err) = partition.meta.write_to(&partition.path) {
            partition.storage.close();
            return Err(err);
        }

        info!(%partition, "created partition");
        Ok(partition.start())
    }

    /// load partition from existing directory holding a meta file
    #[instrument(skip(disk, ctx))]
    pub async fn load(
        partition_dir: &Path,
        disk: SharedDisk,
        ctx: SharedNodeContext,
    ) -> Result<Arc<Self>, PartitionError> {
        let meta = PartitionMeta::read_from(partition_dir)?;
        let partition = Self::open(meta, disk, ctx).await?;

        info!(%partition, "loaded partition");
        Ok(partition.start())
    }

    async fn open(
        meta: PartitionMeta,
        disk: SharedDisk,
        ctx: SharedNodeContext,
    ) -> Result<Self, PartitionError> {
        let path = disk
            .path()
            .join(partition_dir_name(meta.partition_id, meta.partition_size));
        let storage = S::create_or_load(&path, meta.partition_size).await?;

        Ok(Self {
            meta,
            path,
            used: AtomicU64::new(0),
            status: AtomicStatus::new(PartitionStatus::ReadWrite),
            is_leader: AtomicBool::new(false),
            replica_hosts: RwLock::new(vec![]),
            disk,
            storage,
            metrics: PartitionMetrics::new(),
            stop: StopSignal::shared(),
            ctx,
        })
    }

    /// attach to disk and spawn background loops
    fn start(self) -> Arc<Self> {
        let partition = Arc::new(self);
        let handle: Arc<dyn Partition> = partition.clone();
        partition.disk.attach(&handle);
        PartitionScheduler::start_all(&partition, &partition.ctx.config().scheduler());
        partition
    }

    pub fn volume_id(&self) -> &str {
        &self.meta.volume_id
    }

    pub fn partition_type(&self) -> &str {
        &self.meta.partition_type
    }

    pub fn meta(&self) -> &PartitionMeta {
        &self.meta
    }

    pub fn disk(&self) -> &SharedDisk {
        &self.disk
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    pub fn metrics(&self) -> &PartitionMetrics {
        &self.metrics
    }

    pub(crate) fn stop_signal(&self) -> SharedStopSignal {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn add_write_metrics(&self, latency: u64) {
        self.metrics.add_write_metrics(latency);
    }

    pub fn add_read_metrics(&self, latency: u64) {
        self.metrics.add_read_metrics(latency);
    }

    /// sum sizes of entries directly under partition dir
    fn compute_usage(&self) {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = ?self.path, %err, "usage scan skipped");
                return;
            }
        };
        let used: u64 = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum();
        trace!(used, "usage computed");
        self.used.store(used, ORDER);
    }

    /// refresh usage and status, capped by disk status
    pub async fn status_update(&self) {
        self.compute_usage();
        let target = if self.used() >= self.meta.partition_size {
            PartitionStatus::ReadOnly
        } else {
            PartitionStatus::ReadWrite
        };
        if self.is_leader() {
            self.storage.blob_store().move_unavailable_blob_files().await;
        }
        let status = target.min(self.disk.status());
        if status != self.status() {
            debug!(partition = self.id(), %status, "status changed");
        }
        self.status.set(status);
    }

    /// refresh membership and, when leading, check local extent consistency
    #[instrument(skip(self), fields(partition = self.id()))]
    pub async fn launch_repair(&self) {
        if self.status() == PartitionStatus::Unavailable {
            return;
        }
        if self.stop.is_stopped() {
            return;
        }
        if let Err(err) = self.update_replica_hosts().await {
            error!(%err, "replica hosts update failed");
            return;
        }
        if !self.is_leader() {
            return;
        }
        if let Err(err) = self.storage.extent_store().check_consistency().await {
            warn!(%err, "extent consistency check failed");
        }
    }

    /// fetch replica hosts and recompute leadership.
    /// On failure the partition is not leader and the previous host list is kept.
    pub async fn update_replica_hosts(&self) -> Result<(), PartitionError> {
        self.is_leader.store(false, ORDER);
        let hosts = self
            .ctx
            .resolver()
            .replica_hosts(self.meta.partition_id)
            .await?;
        let is_leader = is_leader_host(&hosts, self.ctx.local_ip());

        {
            let mut current = self.replica_hosts.write();
            if !replica_hosts_equal(&current, &hosts) {
                info!(
                    partition = self.id(),
                    from = ?*current,
                    to = ?hosts,
                    "replica hosts changed"
                );
            }
            *current = hosts;
        }
        self.is_leader.store(is_leader, ORDER);
        Ok(())
    }

    /// objects for every oid in range, missing ones as deleted placeholders
    pub async fn get_objects(
        &self,
        blobfile_id: FileId,
        start_oid: ObjectId,
        last_oid: ObjectId,
    ) -> Vec<Object> {
        let blobs = self.storage.blob_store();
        let mut objects = Vec::new();
        for oid in start_oid..=last_oid {
            let object = match blobs.get_object(blobfile_id, oid).await {
                Ok(object) => object,
                Err(err) => {
                    trace!(blobfile_id, oid, %err, "object placeholder");
                    Object::mark_deleted(oid)
                }
            };
            objects.push(object);
        }
        objects
    }

    /// write object header and, unless it is a tombstone, its payload into buf
    pub async fn pack_object(
        &self,
        buf: &mut [u8],
        object: &Object,
        blobfile_id: FileId,
    ) -> Result<(), PartitionError> {
        if buf.len() < OBJECT_HEADER_SIZE {
            return Err(PartitionError::BufferTooSmall {
                len: buf.len(),
                need: OBJECT_HEADER_SIZE,
            });
        }
        object.encode(&mut buf[..OBJECT_HEADER_SIZE])?;
        if object.is_mark_deleted() && object.oid != 0 {
            return Ok(());
        }

        let need = OBJECT_HEADER_SIZE + object.size as usize;
        if buf.len() < need {
            return Err(PartitionError::BufferTooSmall {
                len: buf.len(),
                need,
            });
        }
        self.storage
            .blob_store()
            .read(
                blobfile_id,
                object.oid,
                object.size,
                &mut buf[OBJECT_HEADER_SIZE..],
            )
            .await?;
        Ok(())
    }

    /// apply delete buffer of big endian object ids as one batch
    pub async fn del_objects(
        &self,
        blobfile_id: FileId,
        delete_buf: &[u8],
    ) -> Result<(), PartitionError> {
        let oids = decode_object_ids(delete_buf)?;
        debug!(partition = self.id(), blobfile_id, count = oids.len(), "deleting objects");
        self.storage
            .blob_store()
            .apply_del_objects(blobfile_id, &oids)
            .await?;
        Ok(())
    }

    pub async fn load_response(&self) -> LoadPartitionResponse {
        let mut response = LoadPartitionResponse {
            partition_id: self.id(),
            status: self.status(),
            used: self.used(),
            snapshot: vec![],
            task_status: TaskStatus::Success,
            result: String::new(),
        };

        let snapshot: Result<Vec<FileInfo>, _> = match self.storage.extent_store().snapshot().await {
            Ok(extents) => match self.storage.blob_store().snapshot().await {
                Ok(blobs) => Ok(extents.into_iter().chain(blobs).collect()),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        match snapshot {
            Ok(files) => response.snapshot = files,
            Err(err) => {
                warn!(partition = self.id(), %err, "snapshot failed");
                response.task_status = TaskStatus::Failed;
                response.result = err.to_string();
            }
        }
        response
    }

    /// physically drop extents marked deleted
    pub async fn flush_delete(&self) -> Result<(), PartitionError> {
        self.storage.extent_store().flush_delete().await?;
        Ok(())
    }

    /// watermarks of stable extents
    pub async fn all_extents_meta(&self) -> Result<Vec<FileInfo>, PartitionError> {
        let files = self
            .storage
            .extent_store()
            .watermarks(ExtentFilter::Stable)
            .await?;
        Ok(files)
    }
}

impl<S> Partition for DataPartition<S>
where
    S: PartitionStorage,
{
    fn id(&self) -> PartitionId {
        self.meta.partition_id
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn is_leader(&self) -> bool {
        self.is_leader.load(ORDER)
    }

    fn replica_hosts(&self) -> Vec<HostAddr> {
        self.replica_hosts.read().clone()
    }

    fn size(&self) -> u64 {
        self.meta.partition_size
    }

    fn used(&self) -> u64 {
        self.used.load(ORDER)
    }

    fn status(&self) -> PartitionStatus {
        self.status.get()
    }

    fn change_status(&self, code: i8) {
        match PartitionStatus::from_code(code) {
            Some(status) => self.status.set(status),
            None => trace!(partition = self.id(), code, "ignored status code"),
        }
    }

    fn stop(&self) {
        if self.stop.stop() {
            info!(partition = self.id(), "stopping partition");
            self.storage.close();
        }
    }
}

#[cfg(test)]
mod test {

    use std::fs;
    use std::sync::Arc;

    use cfs_storage::{BlobStore, ExtentStore, FileInfo, Object, PartitionStorage, StorageError};
    use cfs_storage::fixture::MemoryStorage;

    use crate::PartitionError;
    use crate::disk::Disk;
    use crate::meta::PartitionMeta;
    use crate::status::PartitionStatus;
    use crate::test_util::{FakeFetcher, FakeResolver, test_context, test_context_with, test_disk};
    use crate::config::DataNodeConfig;

    use super::*;

    type TestPartition = DataPartition<MemoryStorage>;

    async fn create(disk: &SharedDisk, id: PartitionId, size: u64) -> Arc<TestPartition> {
        TestPartition::create("vol1", id, disk.clone(), size, "extent", test_context())
            .await
            .expect("create")
    }

    async fn with_resolver(
        name: &str,
        resolver: Arc<FakeResolver>,
    ) -> Arc<TestPartition> {
        let config = DataNodeConfig {
            local_ip: "10.0.0.1".to_owned(),
            ..Default::default()
        };
        let ctx = test_context_with(config, resolver, Arc::new(FakeFetcher::default()));
        TestPartition::create("vol1", 11, test_disk(name), 1 << 20, "extent", ctx)
            .await
            .expect("create")
    }

    fn hosts(list: &[&str]) -> Vec<HostAddr> {
        list.iter().map(|host| host.to_string()).collect()
    }

    #[fluvio_future::test]
    async fn test_create_load_round_trip() {
        let disk = test_disk("partition-round-trip");
        let created = create(&disk, 12, 4096).await;
        assert_eq!(created.path(), disk.path().join("datapartition_12_4096"));
        assert_eq!(created.to_string(), "datapartition_12_4096");
        assert!(created.path().join("META").is_file());
        assert!(disk.get(12).is_some());
        let meta = created.meta().clone();
        created.stop();
        drop(created);

        let loaded = TestPartition::load(
            &disk.path().join("datapartition_12_4096"),
            disk.clone(),
            test_context(),
        )
        .await
        .expect("load");
        assert_eq!(loaded.meta(), &meta);
        assert_eq!(loaded.volume_id(), "vol1");
        assert_eq!(loaded.partition_type(), "extent");
        assert_eq!(loaded.size(), 4096);
        assert_eq!(loaded.status(), PartitionStatus::ReadWrite);
        assert!(!loaded.is_leader());
        assert!(loaded.replica_hosts().is_empty());
        assert_eq!(disk.get(12).expect("attached").path(), loaded.path());
        loaded.stop();
    }

    #[fluvio_future::test]
    async fn test_create_invalid_not_attached() {
        let disk = test_disk("partition-create-invalid");
        let result = TestPartition::create("  ", 1, disk.clone(), 100, "extent", test_context()).await;
        assert!(matches!(result, Err(PartitionError::InvalidMeta(_))));

        let result = TestPartition::create("vol", 0, disk.clone(), 100, "extent", test_context()).await;
        assert!(matches!(result, Err(PartitionError::InvalidMeta(_))));

        assert!(disk.partitions().is_empty());
        assert_eq!(fs::read_dir(disk.path()).expect("dir").count(), 0);
    }

    #[fluvio_future::test]
    async fn test_load_invalid_not_attached() {
        let disk = test_disk("partition-load-invalid");

        let missing = disk.path().join("datapartition_1_100");
        fs::create_dir_all(&missing).expect("dir");
        assert!(matches!(
            TestPartition::load(&missing, disk.clone(), test_context()).await,
            Err(PartitionError::Io(_))
        ));

        let malformed = disk.path().join("datapartition_2_100");
        fs::create_dir_all(&malformed).expect("dir");
        fs::write(PartitionMeta::file_path(&malformed), b"[1,2").expect("write");
        assert!(matches!(
            TestPartition::load(&malformed, disk.clone(), test_context()).await,
            Err(PartitionError::MetaDecode { .. })
        ));

        let zero_size = disk.path().join("datapartition_3_0");
        fs::create_dir_all(&zero_size).expect("dir");
        let meta = PartitionMeta {
            volume_id: "vol".to_owned(),
            partition_type: "extent".to_owned(),
            partition_id: 3,
            partition_size: 0,
            create_time: "2018-06-01 10:20:30".to_owned(),
        };
        meta.write_to(&zero_size).expect("write");
        assert!(matches!(
            TestPartition::load(&zero_size, disk.clone(), test_context()).await,
            Err(PartitionError::InvalidMeta(_))
        ));

        assert!(disk.partitions().is_empty());
    }

    #[fluvio_future::test]
    async fn test_status_update_capped_by_disk() {
        let disk = test_disk("partition-status");
        let roomy = create(&disk, 1, 1 << 30).await;
        let full = create(&disk, 2, 1).await;

        roomy.status_update().await;
        full.status_update().await;
        assert!(roomy.used() > 0);
        assert!(roomy.available() < roomy.size());
        assert_eq!(roomy.status(), PartitionStatus::ReadWrite);
        assert_eq!(full.status(), PartitionStatus::ReadOnly);
        assert_eq!(full.available(), 0);

        disk.set_status(PartitionStatus::ReadOnly);
        roomy.status_update().await;
        assert_eq!(roomy.status(), PartitionStatus::ReadOnly);

        disk.set_status(PartitionStatus::Unavailable);
        roomy.status_update().await;
        full.status_update().await;
        assert_eq!(roomy.status(), PartitionStatus::Unavailable);
        assert_eq!(full.status(), PartitionStatus::Unavailable);

        // disk never raises status above what usage allows
        disk.set_status(PartitionStatus::ReadWrite);
        full.status_update().await;
        assert_eq!(full.status(), PartitionStatus::ReadOnly);

        roomy.stop();
        full.stop();
    }

    #[fluvio_future::test]
    async fn test_status_update_keeps_usage_on_scan_failure() {
        let disk = test_disk("partition-usage-scan");
        let partition = create(&disk, 1, 1 << 30).await;
        partition.status_update().await;
        let used = partition.used();
        assert!(used > 0);

        fs::remove_dir_all(partition.path()).expect("remove");
        partition.status_update().await;
        assert_eq!(partition.used(), used);
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_change_status() {
        let disk = test_disk("partition-change-status");
        let partition = create(&disk, 1, 100).await;

        partition.change_status(3);
        partition.change_status(0);
        assert_eq!(partition.status(), PartitionStatus::ReadWrite);

        partition.change_status(1);
        assert_eq!(partition.status(), PartitionStatus::ReadOnly);
        partition.change_status(-1);
        assert_eq!(partition.status(), PartitionStatus::Unavailable);
        partition.change_status(2);
        assert_eq!(partition.status(), PartitionStatus::ReadWrite);
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_leader_determination() {
        let resolver = Arc::new(FakeResolver::default());
        let partition = with_resolver("partition-leader", resolver.clone()).await;

        resolver.set_hosts(hosts(&["10.0.0.1:6000", "10.0.0.2:6000"]));
        partition.update_replica_hosts().await.expect("update");
        assert!(partition.is_leader());
        assert_eq!(
            partition.replica_hosts(),
            hosts(&["10.0.0.1:6000", "10.0.0.2:6000"])
        );

        resolver.set_hosts(hosts(&["10.0.0.2:6000", "10.0.0.1:6000"]));
        partition.update_replica_hosts().await.expect("update");
        assert!(!partition.is_leader());

        resolver.set_hosts(vec![]);
        partition.update_replica_hosts().await.expect("update");
        assert!(!partition.is_leader());
        assert!(partition.replica_hosts().is_empty());

        resolver.set_hosts(hosts(&["10.0.0.1"]));
        partition.update_replica_hosts().await.expect("update");
        assert!(!partition.is_leader());

        // failure drops leadership, keeps last known hosts
        resolver.set_hosts(hosts(&["10.0.0.1:6000"]));
        partition.update_replica_hosts().await.expect("update");
        assert!(partition.is_leader());
        resolver.set_unreachable();
        assert!(matches!(
            partition.update_replica_hosts().await,
            Err(PartitionError::Membership(_))
        ));
        assert!(!partition.is_leader());
        assert_eq!(partition.replica_hosts(), hosts(&["10.0.0.1:6000"]));
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_launch_repair() {
        let resolver = Arc::new(FakeResolver::default());
        let partition = with_resolver("partition-launch-repair", resolver.clone()).await;
        let extents = partition.storage().extent_store();

        resolver.set_hosts(hosts(&["10.0.0.2:6000", "10.0.0.1:6000"]));
        partition.launch_repair().await;
        assert_eq!(resolver.calls(), 1);
        assert_eq!(extents.consistency_checks(), 0);

        resolver.set_hosts(hosts(&["10.0.0.1:6000", "10.0.0.2:6000"]));
        partition.launch_repair().await;
        assert!(partition.is_leader());
        assert_eq!(extents.consistency_checks(), 1);

        // leader moves unavailable blob files on status tick
        partition.status_update().await;
        assert_eq!(partition.storage().blob_store().unavailable_moves(), 1);

        partition.change_status(PartitionStatus::Unavailable.code());
        partition.launch_repair().await;
        assert_eq!(resolver.calls(), 2);

        partition.change_status(PartitionStatus::ReadWrite.code());
        partition.stop();
        partition.launch_repair().await;
        assert_eq!(resolver.calls(), 2);
        assert_eq!(extents.consistency_checks(), 1);
    }

    #[fluvio_future::test]
    async fn test_follower_skips_blob_moves() {
        let resolver = Arc::new(FakeResolver::default());
        let partition = with_resolver("partition-follower-moves", resolver.clone()).await;

        resolver.set_hosts(hosts(&["10.0.0.2:6000", "10.0.0.1:6000"]));
        partition.launch_repair().await;
        partition.status_update().await;
        assert_eq!(partition.storage().blob_store().unavailable_moves(), 0);
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_get_objects_dense() {
        let disk = test_disk("partition-get-objects");
        let partition = create(&disk, 1, 1 << 20).await;
        let blobs = partition.storage().blob_store();
        let five = blobs.put_object(3, 5, b"five").await.expect("put");
        let seven = blobs.put_object(3, 7, b"seven").await.expect("put");

        let objects = partition.get_objects(3, 5, 8).await;
        assert_eq!(
            objects,
            vec![five, Object::mark_deleted(6), seven, Object::mark_deleted(8)]
        );
        assert!(partition.get_objects(3, 9, 8).await.is_empty());
        assert_eq!(partition.get_objects(3, 5, 5).await, vec![five]);
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_pack_object() {
        let disk = test_disk("partition-pack-object");
        let partition = create(&disk, 1, 1 << 20).await;
        let blobs = partition.storage().blob_store();
        blobs.put_object(2, 1, b"first").await.expect("put");
        let object = blobs.put_object(2, 2, b"payload").await.expect("put");

        let mut buf = vec![0u8; OBJECT_HEADER_SIZE + 7];
        partition.pack_object(&mut buf, &object, 2).await.expect("pack");
        assert_eq!(Object::decode(&buf).expect("header"), object);
        assert_eq!(&buf[OBJECT_HEADER_SIZE..], b"payload");

        // tombstone packs header only
        let tombstone = Object::mark_deleted(9);
        let mut header = vec![0u8; OBJECT_HEADER_SIZE];
        partition
            .pack_object(&mut header, &tombstone, 2)
            .await
            .expect("pack tombstone");
        assert_eq!(Object::decode(&header).expect("header"), tombstone);

        assert!(matches!(
            partition.pack_object(&mut [0u8; 8], &object, 2).await,
            Err(PartitionError::BufferTooSmall { len: 8, need: 20 })
        ));
        assert!(matches!(
            partition.pack_object(&mut header, &object, 2).await,
            Err(PartitionError::BufferTooSmall { .. })
        ));
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_del_objects() {
        let disk = test_disk("partition-del-objects");
        let partition = create(&disk, 1, 1 << 20).await;
        let blobs = partition.storage().blob_store();
        for oid in 1..=3 {
            blobs.put_object(4, oid, b"data").await.expect("put");
        }

        let mut delete_buf = 1u64.to_be_bytes().to_vec();
        delete_buf.extend_from_slice(&3u64.to_be_bytes());
        partition.del_objects(4, &delete_buf).await.expect("delete");
        assert!(blobs.get_object(4, 1).await.expect("object").is_mark_deleted());
        assert!(!blobs.get_object(4, 2).await.expect("object").is_mark_deleted());
        assert!(blobs.get_object(4, 3).await.expect("object").is_mark_deleted());

        assert!(matches!(
            partition.del_objects(4, &[0u8; 7]).await,
            Err(PartitionError::InvalidDeleteBuffer { len: 7 })
        ));
        assert!(!blobs.get_object(4, 2).await.expect("object").is_mark_deleted());

        // empty buffer is an empty batch
        partition.del_objects(4, &[]).await.expect("empty");
        assert!(matches!(
            partition.del_objects(42, &delete_buf).await,
            Err(PartitionError::Storage(StorageError::BlobFileNotFound(42)))
        ));
        partition.stop();
    }

    #[test]
    fn test_decode_object_ids() {
        let mut buf = 0x0102u64.to_be_bytes().to_vec();
        buf.extend_from_slice(&u64::MAX.to_be_bytes());
        assert_eq!(decode_object_ids(&buf).expect("decode"), vec![0x0102, u64::MAX]);
        assert!(decode_object_ids(&buf[..9]).is_err());
    }

    #[fluvio_future::test]
    async fn test_load_response() {
        let disk = test_disk("partition-load-response");
        let partition = create(&disk, 6, 1 << 20).await;
        let extents = partition.storage().extent_store();
        extents.put_extent(20, b"twenty").await;
        partition.status_update().await;

        let response = partition.load_response().await;
        assert_eq!(response.partition_id, 6);
        assert_eq!(response.task_status, TaskStatus::Success);
        assert_eq!(response.used, partition.used());
        assert_eq!(response.snapshot.len(), 11);
        assert_eq!(response.snapshot[0], FileInfo::new(20, 6));
        assert_eq!(response.snapshot[1].file_id, 1);

        partition.storage().blob_store().set_fail_snapshot(true);
        let response = partition.load_response().await;
        assert_eq!(response.task_status, TaskStatus::Failed);
        assert!(response.result.contains("blob snapshot failed"));
        assert!(response.snapshot.is_empty());

        partition.storage().blob_store().set_fail_snapshot(false);
        extents.set_fail_snapshot(true);
        let response = partition.load_response().await;
        assert_eq!(response.task_status, TaskStatus::Failed);
        assert!(response.snapshot.is_empty());
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_extent_maintenance() {
        let disk = test_disk("partition-extent-maintenance");
        let partition = create(&disk, 1, 1 << 20).await;
        let extents = partition.storage().extent_store();
        extents.put_extent(20, b"stable").await;
        extents.create(21, 5).await.expect("create");
        extents.put_extent(22, b"gone").await;
        extents.mark_delete(22).await.expect("delete");

        let stable = partition.all_extents_meta().await.expect("meta");
        assert_eq!(stable, vec![FileInfo::new(20, 6)]);

        assert_eq!(extents.extent_count().await, 3);
        partition.flush_delete().await.expect("flush");
        assert_eq!(extents.extent_count().await, 2);
        partition.stop();
    }

    #[fluvio_future::test]
    async fn test_stop_closes_once() {
        let disk = test_disk("partition-stop");
        let partition = create(&disk, 1, 100).await;
        partition.stop();
        partition.stop();
        assert!(partition.is_stopped());
        assert!(partition.storage().extent_store().is_closed());
        assert!(partition.storage().blob_store().is_closed());
    }

    #[fluvio_future::test]
    async fn test_stores_open_at_partition_path() {
        let disk = Disk::shared(
            test_disk("partition-store-path").path().join("nested"),
            PartitionStatus::ReadWrite,
        );
        let partition = create(&disk, 2, 100).await;
        assert_eq!(partition.storage().base_dir(), partition.path());
        assert_eq!(partition.storage().capacity(), 100);
        partition.stop();
    }
}
