//!
//! # In-memory store binding
//!
//! Keeps extent and blob data in memory while still creating the partition
//! directory, so partitions built on it behave like on-disk ones for layout
//! and usage accounting. Counters and failure switches let tests observe and
//! steer the store.
//!
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_lock::RwLock;
use async_trait::async_trait;
use tracing::debug;

use cfs_types::{ExtentId, FileId, ObjectId};

use crate::{
    BlobStore, ExtentFilter, ExtentStore, FileInfo, Object, PartitionStorage, StorageError,
    BLOB_FILE_COUNT,
};

const ORDER: Ordering = Ordering::SeqCst;

fn write_at(data: &mut Vec<u8>, offset: u64, bytes: &[u8]) -> Result<(), StorageError> {
    let size = data.len() as u64;
    if offset > size {
        return Err(StorageError::OutOfRange { offset, size });
    }
    let start = offset as usize;
    let end = start + bytes.len();
    if end > data.len() {
        data.resize(end, 0);
    }
    data[start..end].copy_from_slice(bytes);
    Ok(())
}

fn read_at(data: &[u8], offset: u64, buf: &mut [u8]) -> Result<usize, StorageError> {
    let size = data.len() as u64;
    if offset > size {
        return Err(StorageError::OutOfRange { offset, size });
    }
    let start = offset as usize;
    let len = buf.len().min(data.len() - start);
    buf[..len].copy_from_slice(&data[start..start + len]);
    Ok(len)
}

#[derive(Debug)]
pub struct MemoryStorage {
    base_dir: PathBuf,
    capacity: u64,
    extents: MemExtentStore,
    blobs: MemBlobStore,
}

impl MemoryStorage {
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[async_trait]
impl PartitionStorage for MemoryStorage {
    type Extents = MemExtentStore;
    type Blobs = MemBlobStore;

    async fn create_or_load(base_dir: &Path, capacity: u64) -> Result<Self, StorageError> {
        std::fs::create_dir_all(base_dir)?;
        debug!(?base_dir, capacity, "opened memory storage");
        Ok(Self {
            base_dir: base_dir.to_owned(),
            capacity,
            extents: MemExtentStore::default(),
            blobs: MemBlobStore::default(),
        })
    }

    fn extent_store(&self) -> &MemExtentStore {
        &self.extents
    }

    fn blob_store(&self) -> &MemBlobStore {
        &self.blobs
    }
}

#[derive(Debug, Default)]
struct MemExtent {
    inode: u64,
    data: Vec<u8>,
    deleted: bool,
}

#[derive(Debug, Default)]
pub struct MemExtentStore {
    extents: RwLock<BTreeMap<ExtentId, MemExtent>>,
    creates: AtomicU64,
    consistency_checks: AtomicU64,
    fail_snapshot: AtomicBool,
    closed: AtomicBool,
}

impl MemExtentStore {
    /// insert extent with content, replacing any existing one
    pub async fn put_extent(&self, extent_id: ExtentId, data: &[u8]) {
        let mut extents = self.extents.write().await;
        extents.insert(
            extent_id,
            MemExtent {
                data: data.to_vec(),
                ..Default::default()
            },
        );
    }

    pub async fn extent_data(&self, extent_id: ExtentId) -> Option<Vec<u8>> {
        let extents = self.extents.read().await;
        extents
            .get(&extent_id)
            .filter(|extent| !extent.deleted)
            .map(|extent| extent.data.clone())
    }

    pub async fn is_mark_deleted(&self, extent_id: ExtentId) -> bool {
        let extents = self.extents.read().await;
        extents
            .get(&extent_id)
            .map(|extent| extent.deleted)
            .unwrap_or(false)
    }

    pub async fn extent_count(&self) -> usize {
        self.extents.read().await.len()
    }

    pub fn creates(&self) -> u64 {
        self.creates.load(ORDER)
    }

    pub fn consistency_checks(&self) -> u64 {
        self.consistency_checks.load(ORDER)
    }

    pub fn set_fail_snapshot(&self, fail: bool) {
        self.fail_snapshot.store(fail, ORDER);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(ORDER)
    }

    async fn list(&self) -> Vec<FileInfo> {
        let extents = self.extents.read().await;
        extents
            .iter()
            .filter(|(_, extent)| !extent.deleted)
            .map(|(id, extent)| FileInfo {
                file_id: *id as FileId,
                inode: extent.inode,
                source: String::new(),
                size: extent.data.len() as u64,
            })
            .collect()
    }
}

#[async_trait]
impl ExtentStore for MemExtentStore {
    async fn is_exist_extent(&self, extent_id: ExtentId) -> bool {
        let extents = self.extents.read().await;
        extents
            .get(&extent_id)
            .map(|extent| !extent.deleted)
            .unwrap_or(false)
    }

    async fn create(&self, extent_id: ExtentId, inode: u64) -> Result<(), StorageError> {
        let mut extents = self.extents.write().await;
        if extents.get(&extent_id).is_some_and(|extent| !extent.deleted) {
            return Err(StorageError::ExtentExists(extent_id));
        }
        extents.insert(
            extent_id,
            MemExtent {
                inode,
                ..Default::default()
            },
        );
        self.creates.fetch_add(1, ORDER);
        Ok(())
    }

    async fn mark_delete(&self, extent_id: ExtentId) -> Result<(), StorageError> {
        let mut extents = self.extents.write().await;
        match extents.get_mut(&extent_id) {
            Some(extent) => {
                extent.deleted = true;
                Ok(())
            }
            None => Err(StorageError::ExtentNotFound(extent_id)),
        }
    }

    async fn flush_delete(&self) -> Result<(), StorageError> {
        let mut extents = self.extents.write().await;
        extents.retain(|_, extent| !extent.deleted);
        Ok(())
    }

    async fn extent_size(&self, extent_id: ExtentId) -> Result<u64, StorageError> {
        let extents = self.extents.read().await;
        extents
            .get(&extent_id)
            .filter(|extent| !extent.deleted)
            .map(|extent| extent.data.len() as u64)
            .ok_or(StorageError::ExtentNotFound(extent_id))
    }

    async fn write(
        &self,
        extent_id: ExtentId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let mut extents = self.extents.write().await;
        match extents.get_mut(&extent_id).filter(|extent| !extent.deleted) {
            Some(extent) => write_at(&mut extent.data, offset, data),
            None => Err(StorageError::ExtentNotFound(extent_id)),
        }
    }

    async fn read(
        &self,
        extent_id: ExtentId,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, StorageError> {
        let extents = self.extents.read().await;
        match extents.get(&extent_id).filter(|extent| !extent.deleted) {
            Some(extent) => read_at(&extent.data, offset, buf),
            None => Err(StorageError::ExtentNotFound(extent_id)),
        }
    }

    async fn snapshot(&self) -> Result<Vec<FileInfo>, StorageError> {
        if self.fail_snapshot.load(ORDER) {
            return Err(StorageError::Other("extent snapshot failed".to_owned()));
        }
        Ok(self.list().await)
    }

    async fn watermarks(&self, filter: ExtentFilter) -> Result<Vec<FileInfo>, StorageError> {
        let files = self.list().await;
        Ok(match filter {
            ExtentFilter::All => files,
            ExtentFilter::Stable => files.into_iter().filter(|file| file.size > 0).collect(),
        })
    }

    async fn check_consistency(&self) -> Result<(), StorageError> {
        self.consistency_checks.fetch_add(1, ORDER);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, ORDER);
    }
}

#[derive(Debug, Default)]
struct MemBlobFile {
    data: Vec<u8>,
    objects: BTreeMap<ObjectId, Object>,
}

#[derive(Debug)]
pub struct MemBlobStore {
    files: RwLock<BTreeMap<FileId, MemBlobFile>>,
    unavailable_moves: AtomicU64,
    fail_snapshot: AtomicBool,
    closed: AtomicBool,
}

impl Default for MemBlobStore {
    fn default() -> Self {
        let files = (1..=BLOB_FILE_COUNT)
            .map(|id| (id, MemBlobFile::default()))
            .collect();
        Self {
            files: RwLock::new(files),
            unavailable_moves: AtomicU64::new(0),
            fail_snapshot: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }
}

impl MemBlobStore {
    /// append payload to blob file and index it under oid
    pub async fn put_object(
        &self,
        blobfile_id: FileId,
        oid: ObjectId,
        payload: &[u8],
    ) -> Result<Object, StorageError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(&blobfile_id)
            .ok_or(StorageError::BlobFileNotFound(blobfile_id))?;
        let object = Object::new(
            oid,
            file.data.len() as u32,
            payload.len() as u32,
            crc32c::crc32c(payload),
        );
        file.data.extend_from_slice(payload);
        file.objects.insert(oid, object);
        Ok(object)
    }

    pub async fn blob_file_data(&self, blobfile_id: FileId) -> Option<Vec<u8>> {
        let files = self.files.read().await;
        files.get(&blobfile_id).map(|file| file.data.clone())
    }

    pub fn unavailable_moves(&self) -> u64 {
        self.unavailable_moves.load(ORDER)
    }

    pub fn set_fail_snapshot(&self, fail: bool) {
        self.fail_snapshot.store(fail, ORDER);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(ORDER)
    }
}

#[async_trait]
impl BlobStore for MemBlobStore {
    async fn get_object(
        &self,
        blobfile_id: FileId,
        oid: ObjectId,
    ) -> Result<Object, StorageError> {
        let files = self.files.read().await;
        let file = files
            .get(&blobfile_id)
            .ok_or(StorageError::BlobFileNotFound(blobfile_id))?;
        file.objects
            .get(&oid)
            .copied()
            .ok_or(StorageError::ObjectNotFound { blobfile_id, oid })
    }

    async fn read(
        &self,
        blobfile_id: FileId,
        oid: ObjectId,
        size: u32,
        buf: &mut [u8],
    ) -> Result<usize, StorageError> {
        let files = self.files.read().await;
        let file = files
            .get(&blobfile_id)
            .ok_or(StorageError::BlobFileNotFound(blobfile_id))?;
        let object = file
            .objects
            .get(&oid)
            .filter(|object| !object.is_mark_deleted())
            .ok_or(StorageError::ObjectNotFound { blobfile_id, oid })?;
        let size = size as usize;
        if buf.len() < size {
            return Err(StorageError::BufferTooSmall {
                len: buf.len(),
                need: size,
            });
        }
        read_at(&file.data, object.offset as u64, &mut buf[..size])
    }

    async fn apply_del_objects(
        &self,
        blobfile_id: FileId,
        oids: &[ObjectId],
    ) -> Result<(), StorageError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(&blobfile_id)
            .ok_or(StorageError::BlobFileNotFound(blobfile_id))?;
        for oid in oids {
            if let Some(object) = file.objects.get_mut(oid) {
                object.size = crate::MARK_DELETE_OBJECT;
            }
        }
        Ok(())
    }

    async fn blob_file_size(&self, blobfile_id: FileId) -> Result<u64, StorageError> {
        let files = self.files.read().await;
        files
            .get(&blobfile_id)
            .map(|file| file.data.len() as u64)
            .ok_or(StorageError::BlobFileNotFound(blobfile_id))
    }

    async fn write(
        &self,
        blobfile_id: FileId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(&blobfile_id)
            .ok_or(StorageError::BlobFileNotFound(blobfile_id))?;
        write_at(&mut file.data, offset, data)
    }

    async fn snapshot(&self) -> Result<Vec<FileInfo>, StorageError> {
        if self.fail_snapshot.load(ORDER) {
            return Err(StorageError::Other("blob snapshot failed".to_owned()));
        }
        let files = self.files.read().await;
        Ok(files
            .iter()
            .map(|(id, file)| FileInfo::new(*id, file.data.len() as u64))
            .collect())
    }

    async fn move_unavailable_blob_files(&self) {
        self.unavailable_moves.fetch_add(1, ORDER);
    }

    fn close_all(&self) {
        self.closed.store(true, ORDER);
    }
}
