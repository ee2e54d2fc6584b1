use std::fmt;

use bytes::{Buf, BufMut};
use serde::{Serialize, Deserialize};

use cfs_types::{FileId, ObjectId};

use crate::StorageError;

/// size value of an object which has been deleted
pub const MARK_DELETE_OBJECT: u32 = u32::MAX;

/// oid | offset | size | crc
pub const OBJECT_HEADER_SIZE: usize = 20;

/// encoded width of an object id in delete buffers
pub const OBJECT_ID_LEN: usize = 8;

/// blob file ids live in 1..=BLOB_FILE_COUNT, extents use ids above it
pub const BLOB_FILE_COUNT: FileId = 10;

/// check whether the file id belongs to the blob file range
pub fn is_blob_file(file_id: FileId) -> bool {
    file_id <= BLOB_FILE_COUNT
}

/// Object (needle) stored in a blob file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub oid: ObjectId,
    pub offset: u32,
    pub size: u32,
    pub crc: u32,
}

impl Object {
    pub fn new(oid: ObjectId, offset: u32, size: u32, crc: u32) -> Self {
        Self {
            oid,
            offset,
            size,
            crc,
        }
    }

    /// placeholder for object which is missing or deleted
    pub fn mark_deleted(oid: ObjectId) -> Self {
        Self {
            oid,
            size: MARK_DELETE_OBJECT,
            ..Default::default()
        }
    }

    pub fn is_mark_deleted(&self) -> bool {
        self.size == MARK_DELETE_OBJECT
    }

    /// write header into start of buffer
    pub fn encode(&self, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() < OBJECT_HEADER_SIZE {
            return Err(StorageError::BufferTooSmall {
                len: buf.len(),
                need: OBJECT_HEADER_SIZE,
            });
        }
        let mut dest = &mut buf[..OBJECT_HEADER_SIZE];
        dest.put_u64(self.oid);
        dest.put_u32(self.offset);
        dest.put_u32(self.size);
        dest.put_u32(self.crc);
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, StorageError> {
        if buf.len() < OBJECT_HEADER_SIZE {
            return Err(StorageError::BufferTooSmall {
                len: buf.len(),
                need: OBJECT_HEADER_SIZE,
            });
        }
        let mut src = &buf[..OBJECT_HEADER_SIZE];
        Ok(Self {
            oid: src.get_u64(),
            offset: src.get_u32(),
            size: src.get_u32(),
            crc: src.get_u32(),
        })
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "object(oid:{} offset:{} size:{} crc:{})",
            self.oid, self.offset, self.size, self.crc
        )
    }
}
