use std::io::Error as IoError;
use std::path::PathBuf;

use cfs_storage::StorageError;

use crate::membership::MembershipError;

#[derive(thiserror::Error, Debug)]
pub enum PartitionError {
    #[error("partition io error: {0}")]
    Io(#[from] IoError),
    #[error("malformed meta file {path}: {source}")]
    MetaDecode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("meta encode error: {0}")]
    MetaEncode(serde_json::Error),
    #[error("illegal data partition meta: {0}")]
    InvalidMeta(String),
    #[error("delete buffer of {len} bytes is not a multiple of object id length")]
    InvalidDeleteBuffer { len: usize },
    #[error("buffer of {len} bytes can't hold {need} bytes")]
    BufferTooSmall { len: usize, need: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Membership(#[from] MembershipError),
}
