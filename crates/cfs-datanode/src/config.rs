//!
//! # Data node configuration
//!
//! Parameters looked up in following sequence (first value wins):
//!     1) environment variables
//!     2) configuration file
//!     3) defaults
//!
use std::env;
use std::path::Path;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Serialize, Deserialize};
use tracing::debug;

use cfs_types::config_file::{LoadConfigError, SaveLoadConfig};
use cfs_types::defaults::{
    CFS_DATANODE_CONFIG, CFS_LOCAL_IP, MASTER_DEFAULT_ADDR, MIN_SCHEDULER_INTERVAL_MS, PARTITION_METRICS_INTERVAL_MS,
    PARTITION_STATUS_INTERVAL_MS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataNodeConfig {
    /// address of this node as it appears in replica host lists
    pub local_ip: String,
    /// metadata authority endpoints, tried in order
    pub master_addrs: Vec<String>,
    pub status_interval_ms: u64,
    pub metrics_interval_ms: u64,
    /// cap on concurrent size repairs per merge call, unbounded when absent
    pub max_repair_concurrency: Option<usize>,
}

impl Default for DataNodeConfig {
    fn default() -> Self {
        Self {
            local_ip: "127.0.0.1".to_owned(),
            master_addrs: vec![MASTER_DEFAULT_ADDR.to_owned()],
            status_interval_ms: PARTITION_STATUS_INTERVAL_MS,
            metrics_interval_ms: PARTITION_METRICS_INTERVAL_MS,
            max_repair_concurrency: None,
        }
    }
}

impl DataNodeConfig {
    /// load from file then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env();
        Ok(config)
    }

    /// load from file named by environment, defaults when not set
    pub fn load_default() -> Result<Self, LoadConfigError> {
        match env::var(CFS_DATANODE_CONFIG) {
            Ok(path) => Self::load(path),
            Err(_) => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    pub fn apply_env(&mut self) {
        if let Ok(local_ip) = env::var(CFS_LOCAL_IP) {
            debug!(%local_ip, "local ip from environment");
            self.local_ip = local_ip;
        }
    }

    /// loop timings, intervals below the minimum are raised to it
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            status_interval: Duration::from_millis(
                self.status_interval_ms.max(MIN_SCHEDULER_INTERVAL_MS),
            ),
            metrics_interval: Duration::from_millis(
                self.metrics_interval_ms.max(MIN_SCHEDULER_INTERVAL_MS),
            ),
        }
    }
}

/// timings of the per partition background loops
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    #[builder(default = "Duration::from_millis(PARTITION_STATUS_INTERVAL_MS)")]
    pub status_interval: Duration,
    #[builder(default = "Duration::from_millis(PARTITION_METRICS_INTERVAL_MS)")]
    pub metrics_interval: Duration,
}

impl SchedulerConfig {
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}
