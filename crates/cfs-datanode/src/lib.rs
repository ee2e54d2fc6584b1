pub mod config;
pub mod context;
pub mod disk;
mod error;
pub mod membership;
pub mod meta;
pub mod metrics;
pub mod partition;
pub mod repair;
pub mod status;

#[cfg(test)]
mod test_util;

pub use self::error::PartitionError;
pub use self::config::DataNodeConfig;
pub use self::context::{NodeContext, SharedNodeContext};
pub use self::disk::{Disk, SharedDisk};
pub use self::partition::{DataPartition, LoadPartitionResponse, Partition, TaskStatus};
pub use self::repair::{MembersFileMetas, RepairFetcher, StoreKind};
pub use self::status::PartitionStatus;
