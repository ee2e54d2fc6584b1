//!
//! # Membership
//!
//! Ordered replica host list of a partition, as assigned by the metadata
//! authority. The first host is the leader.
//!
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn, instrument};

use cfs_types::{HostAddr, PartitionId};
use cfs_types::defaults::MASTER_GET_DATA_PARTITION;

use crate::config::DataNodeConfig;

#[derive(thiserror::Error, Debug)]
pub enum MembershipError {
    #[error("no master address configured")]
    NoMaster,
    #[error("request to master {addr} failed: {msg}")]
    Request { addr: String, msg: String },
    #[error("invalid data partition view from master {addr}: {source}")]
    Decode {
        addr: String,
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait MembershipResolver: Send + Sync {
    /// ordered replica hosts of the partition, leader first
    async fn replica_hosts(
        &self,
        partition_id: PartitionId,
    ) -> Result<Vec<HostAddr>, MembershipError>;
}

/// element-wise equality, order matters
pub fn replica_hosts_equal(current: &[HostAddr], fetched: &[HostAddr]) -> bool {
    current.len() == fetched.len() && current.iter().zip(fetched).all(|(a, b)| a == b)
}

/// true when the host part of the first `host:port` entry is the local address
pub fn is_leader_host(hosts: &[HostAddr], local_ip: &str) -> bool {
    let Some(leader_addr) = hosts.first() else {
        return false;
    };
    let parts: Vec<&str> = leader_addr.split(':').collect();
    parts.len() == 2 && parts[0].trim() == local_ip
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DataPartitionView {
    #[serde(default)]
    persistence_hosts: Option<Vec<HostAddr>>,
}

/// extract replica hosts from the master's data partition view
pub fn parse_partition_view(body: &[u8]) -> Result<Vec<HostAddr>, serde_json::Error> {
    let view: DataPartitionView = serde_json::from_slice(body)?;
    Ok(view.persistence_hosts.unwrap_or_default())
}

/// Resolves membership over the master's admin http api
#[derive(Debug, Clone)]
pub struct MasterClient {
    addrs: Vec<String>,
    agent: ureq::Agent,
}

impl MasterClient {
    pub fn new(addrs: Vec<String>) -> Self {
        Self {
            addrs,
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn from_config(config: &DataNodeConfig) -> Self {
        Self::new(config.master_addrs.clone())
    }

    async fn get_partition(
        &self,
        addr: &str,
        partition_id: PartitionId,
    ) -> Result<Vec<HostAddr>, MembershipError> {
        let url = format!("http://{addr}{MASTER_GET_DATA_PARTITION}");
        let agent = self.agent.clone();
        let id = partition_id.to_string();

        let body = blocking::unblock(move || -> Result<String, String> {
            let response = agent
                .get(&url)
                .query("id", &id)
                .call()
                .map_err(|err| err.to_string())?;
            response.into_string().map_err(|err| err.to_string())
        })
        .await
        .map_err(|msg| MembershipError::Request {
            addr: addr.to_owned(),
            msg,
        })?;

        parse_partition_view(body.as_bytes()).map_err(|source| MembershipError::Decode {
            addr: addr.to_owned(),
            source,
        })
    }
}

#[async_trait]
impl MembershipResolver for MasterClient {
    #[instrument(skip(self))]
    async fn replica_hosts(
        &self,
        partition_id: PartitionId,
    ) -> Result<Vec<HostAddr>, MembershipError> {
        let mut last_err = MembershipError::NoMaster;
        for addr in &self.addrs {
            let start = Instant::now();
            match self.get_partition(addr, partition_id).await {
                Ok(hosts) => {
                    debug!(%addr, ?hosts, elapsed = ?start.elapsed(), "fetched replica hosts");
                    return Ok(hosts);
                }
                Err(err) => {
                    warn!(%addr, %err, "master request failed, trying next");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
