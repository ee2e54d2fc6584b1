use std::io::Error as IoError;

use cfs_types::{ExtentId, FileId, ObjectId};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("extent {0} not found")]
    ExtentNotFound(ExtentId),
    #[error("extent {0} already exists")]
    ExtentExists(ExtentId),
    #[error("blob file {0} not found")]
    BlobFileNotFound(FileId),
    #[error("object {oid} not found in blob file {blobfile_id}")]
    ObjectNotFound { blobfile_id: FileId, oid: ObjectId },
    #[error("offset {offset} out of range, file size {size}")]
    OutOfRange { offset: u64, size: u64 },
    #[error("buffer of {len} bytes, need {need}")]
    BufferTooSmall { len: usize, need: usize },
    #[error("store closed")]
    Closed,
    #[error("storage error: {0}")]
    Other(String),
}
