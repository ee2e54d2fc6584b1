//!
//! # Defaults
//!
//! Names and default values shared by the data node crates
//!

// partition directory layout
pub const DATA_PARTITION_PREFIX: &str = "datapartition";
pub const DATA_PARTITION_META_FILE: &str = "META";
pub const META_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

// schedulers
pub const PARTITION_STATUS_INTERVAL_MS: u64 = 10_000;
pub const PARTITION_METRICS_INTERVAL_MS: u64 = 2_000;
pub const MIN_SCHEDULER_INTERVAL_MS: u64 = 10;

// metadata authority
pub const MASTER_GET_DATA_PARTITION: &str = "/dataPartition/get";
pub const MASTER_DEFAULT_ADDR: &str = "127.0.0.1:8080";

// environment variables
pub const CFS_LOCAL_IP: &str = "CFS_LOCAL_IP";
pub const CFS_DATANODE_CONFIG: &str = "CFS_DATANODE_CONFIG";
