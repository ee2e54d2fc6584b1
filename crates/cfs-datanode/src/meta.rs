//!
//! # Partition meta file
//!
//! Identity of a data partition, written once into the `META` file of the
//! partition directory when the partition is created and read back on load.
//!
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Serialize, Deserialize};
use tracing::debug;

use cfs_types::PartitionId;
use cfs_types::defaults::{DATA_PARTITION_META_FILE, META_TIME_LAYOUT};

use crate::PartitionError;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartitionMeta {
    pub volume_id: String,
    pub partition_type: String,
    pub partition_id: PartitionId,
    pub partition_size: u64,
    pub create_time: String,
}

impl PartitionMeta {
    /// new meta stamped with current local time
    pub fn new(
        volume_id: impl Into<String>,
        partition_id: PartitionId,
        partition_size: u64,
        partition_type: impl Into<String>,
    ) -> Self {
        Self {
            volume_id: volume_id.into(),
            partition_type: partition_type.into(),
            partition_id,
            partition_size,
            create_time: Local::now().format(META_TIME_LAYOUT).to_string(),
        }
    }

    pub fn file_path(partition_dir: &Path) -> PathBuf {
        partition_dir.join(DATA_PARTITION_META_FILE)
    }

    /// trim string fields, then reject empty or zero fields
    pub fn validate(&mut self) -> Result<(), PartitionError> {
        self.volume_id = self.volume_id.trim().to_owned();
        self.partition_type = self.partition_type.trim().to_owned();

        let missing = if self.volume_id.is_empty() {
            Some("volume id")
        } else if self.partition_type.is_empty() {
            Some("partition type")
        } else if self.partition_id == 0 {
            Some("partition id")
        } else if self.partition_size == 0 {
            Some("partition size")
        } else {
            None
        };

        match missing {
            Some(field) => Err(PartitionError::InvalidMeta(format!("{field} is missing"))),
            None => Ok(()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PartitionError> {
        serde_json::to_vec(self).map_err(PartitionError::MetaEncode)
    }

    pub fn decode(path: &Path, data: &[u8]) -> Result<Self, PartitionError> {
        serde_json::from_slice(data).map_err(|source| PartitionError::MetaDecode {
            path: path.to_owned(),
            source,
        })
    }

    /// write meta file into partition dir, replacing previous content
    pub fn write_to(&self, partition_dir: &Path) -> Result<(), PartitionError> {
        let path = Self::file_path(partition_dir);
        debug!(?path, partition = self.partition_id, "writing meta");
        let data = self.encode()?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        Ok(())
    }

    /// read, decode and validate meta file from partition dir
    pub fn read_from(partition_dir: &Path) -> Result<Self, PartitionError> {
        let path = Self::file_path(partition_dir);
        let data = fs::read(&path)?;
        let mut meta = Self::decode(&path, &data)?;
        meta.validate()?;
        Ok(meta)
    }
}
