mod error;
pub mod object;

#[cfg(feature = "fixture")]
pub mod fixture;

pub use crate::error::StorageError;
pub use crate::object::{Object, BLOB_FILE_COUNT, MARK_DELETE_OBJECT, OBJECT_HEADER_SIZE, OBJECT_ID_LEN};

pub use inner::*;
mod inner {

    use std::fmt;
    use std::path::Path;

    use async_trait::async_trait;
    use serde::{Serialize, Deserialize};

    use cfs_types::{ExtentId, FileId, ObjectId};

    use crate::{Object, StorageError};

    /// Describes a backing file, either listed from a store or carried by a repair task
    #[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FileInfo {
        pub file_id: FileId,
        pub inode: u64,
        /// replica address holding the authoritative bytes
        pub source: String,
        pub size: u64,
    }

    impl FileInfo {
        pub fn new(file_id: FileId, size: u64) -> Self {
            Self {
                file_id,
                size,
                ..Default::default()
            }
        }

        pub fn with_source(mut self, source: impl Into<String>) -> Self {
            self.source = source.into();
            self
        }

        pub fn with_inode(mut self, inode: u64) -> Self {
            self.inode = inode;
            self
        }
    }

    impl fmt::Display for FileInfo {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(
                f,
                "file(id:{} inode:{} size:{} source:{})",
                self.file_id, self.inode, self.size, self.source
            )
        }
    }

    /// which extents to enumerate when listing watermarks
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ExtentFilter {
        All,
        /// extents no longer being appended to
        Stable,
    }

    /// Store of large sequentially written extents
    #[async_trait]
    pub trait ExtentStore: Send + Sync {
        async fn is_exist_extent(&self, extent_id: ExtentId) -> bool;

        async fn create(&self, extent_id: ExtentId, inode: u64) -> Result<(), StorageError>;

        /// mark extent as deleted, space is reclaimed by `flush_delete`
        async fn mark_delete(&self, extent_id: ExtentId) -> Result<(), StorageError>;

        async fn flush_delete(&self) -> Result<(), StorageError>;

        async fn extent_size(&self, extent_id: ExtentId) -> Result<u64, StorageError>;

        async fn write(
            &self,
            extent_id: ExtentId,
            offset: u64,
            data: &[u8],
        ) -> Result<(), StorageError>;

        async fn read(
            &self,
            extent_id: ExtentId,
            offset: u64,
            buf: &mut [u8],
        ) -> Result<usize, StorageError>;

        async fn snapshot(&self) -> Result<Vec<FileInfo>, StorageError>;

        async fn watermarks(&self, filter: ExtentFilter) -> Result<Vec<FileInfo>, StorageError>;

        /// internal consistency pass, run only by the partition leader
        async fn check_consistency(&self) -> Result<(), StorageError>;

        fn close(&self);
    }

    /// Store of small objects packed into a fixed set of blob files
    #[async_trait]
    pub trait BlobStore: Send + Sync {
        async fn get_object(&self, blobfile_id: FileId, oid: ObjectId)
        -> Result<Object, StorageError>;

        /// read payload of object into buf, return bytes read
        async fn read(
            &self,
            blobfile_id: FileId,
            oid: ObjectId,
            size: u32,
            buf: &mut [u8],
        ) -> Result<usize, StorageError>;

        async fn apply_del_objects(
            &self,
            blobfile_id: FileId,
            oids: &[ObjectId],
        ) -> Result<(), StorageError>;

        async fn blob_file_size(&self, blobfile_id: FileId) -> Result<u64, StorageError>;

        async fn write(
            &self,
            blobfile_id: FileId,
            offset: u64,
            data: &[u8],
        ) -> Result<(), StorageError>;

        async fn snapshot(&self) -> Result<Vec<FileInfo>, StorageError>;

        /// move blob files the store deems unavailable into its pending set
        async fn move_unavailable_blob_files(&self);

        fn close_all(&self);
    }

    /// Store binding owned by one data partition
    #[async_trait]
    pub trait PartitionStorage: Sized + Send + Sync + 'static {
        type Extents: ExtentStore;
        type Blobs: BlobStore;

        /// open stores under base dir, creating it when missing
        async fn create_or_load(base_dir: &Path, capacity: u64) -> Result<Self, StorageError>;

        fn extent_store(&self) -> &Self::Extents;

        fn blob_store(&self) -> &Self::Blobs;

        fn close(&self) {
            self.extent_store().close();
            self.blob_store().close_all();
        }
    }
}
