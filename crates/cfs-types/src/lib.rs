pub mod defaults;
pub mod config_file;

#[cfg(feature = "events")]
pub mod event;

//
// Types
//
pub type PartitionId = u32;

// Storage
pub type FileId = u32;
pub type ExtentId = u64;
pub type ObjectId = u64;

// Replica address in `host:port` form
pub type HostAddr = String;
