use std::fmt;
use std::sync::atomic::{AtomicI8, Ordering};

use serde::{Serialize, Deserialize};

/// Partition or disk status.
/// Ordered from most to least restrictive, so `min` picks the stricter one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum PartitionStatus {
    Unavailable = -1,
    ReadOnly = 1,
    ReadWrite = 2,
}

impl PartitionStatus {
    /// wire code of the status
    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Self::Unavailable),
            1 => Some(Self::ReadOnly),
            2 => Some(Self::ReadWrite),
            _ => None,
        }
    }
}

impl fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Unavailable => "Unavailable",
            Self::ReadOnly => "ReadOnly",
            Self::ReadWrite => "ReadWrite",
        };
        write!(f, "{name}")
    }
}

/// status readable from any thread while its owner updates it
#[derive(Debug)]
pub struct AtomicStatus(AtomicI8);

impl AtomicStatus {
    pub fn new(status: PartitionStatus) -> Self {
        Self(AtomicI8::new(status.code()))
    }

    pub fn get(&self) -> PartitionStatus {
        // only valid codes are ever stored
        PartitionStatus::from_code(self.0.load(Ordering::SeqCst))
            .unwrap_or(PartitionStatus::Unavailable)
    }

    pub fn set(&self, status: PartitionStatus) {
        self.0.store(status.code(), Ordering::SeqCst);
    }
}
