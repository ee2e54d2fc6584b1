use std::collections::HashMap;
use std::env::temp_dir;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;

use fluvio_future::timer::sleep;
use flv_util::fixture::ensure_new_dir;
use cfs_types::{FileId, HostAddr, PartitionId};

use crate::config::DataNodeConfig;
use crate::context::{NodeContext, SharedNodeContext};
use crate::disk::{Disk, SharedDisk};
use crate::membership::{MembershipError, MembershipResolver};
use crate::repair::{RepairFetcher, StoreKind};
use crate::status::PartitionStatus;

/// fresh read write disk under temp dir
pub(crate) fn test_disk(name: &str) -> SharedDisk {
    let path = temp_dir().join(format!("cfs-datanode-{name}"));
    ensure_new_dir(&path).expect("new dir");
    Disk::shared(path, PartitionStatus::ReadWrite)
}

pub(crate) fn test_context() -> SharedNodeContext {
    test_context_with(
        DataNodeConfig::default(),
        Arc::new(FakeResolver::default()),
        Arc::new(FakeFetcher::default()),
    )
}

pub(crate) fn test_context_with(
    config: DataNodeConfig,
    resolver: Arc<FakeResolver>,
    fetcher: Arc<FakeFetcher>,
) -> SharedNodeContext {
    NodeContext::shared(config, resolver, fetcher)
}

/// Resolver answering with hosts set by the test, or failing when unreachable
#[derive(Debug)]
pub(crate) struct FakeResolver {
    hosts: Mutex<Option<Vec<HostAddr>>>,
    calls: AtomicU64,
}

impl Default for FakeResolver {
    fn default() -> Self {
        Self {
            hosts: Mutex::new(Some(vec![])),
            calls: AtomicU64::new(0),
        }
    }
}

impl FakeResolver {
    pub(crate) fn set_hosts(&self, hosts: Vec<HostAddr>) {
        *self.hosts.lock() = Some(hosts);
    }

    pub(crate) fn set_unreachable(&self) {
        *self.hosts.lock() = None;
    }

    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipResolver for FakeResolver {
    async fn replica_hosts(
        &self,
        _partition_id: PartitionId,
    ) -> Result<Vec<HostAddr>, MembershipError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hosts.lock().clone().ok_or(MembershipError::Request {
            addr: "fake-master".to_owned(),
            msg: "connection refused".to_owned(),
        })
    }
}

/// Serves file content registered per replica, other replicas are unreachable
#[derive(Debug, Default)]
pub(crate) struct FakeFetcher {
    files: Mutex<HashMap<(String, StoreKind, FileId), Vec<u8>>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl FakeFetcher {
    pub(crate) fn put(&self, source: &str, kind: StoreKind, file_id: FileId, data: &[u8]) {
        self.files
            .lock()
            .insert((source.to_owned(), kind, file_id), data.to_vec());
    }

    /// hold every fetch for this long before answering
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// most fetches observed running at once
    pub(crate) fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn read(
        &self,
        source: &str,
        kind: StoreKind,
        file_id: FileId,
        offset: u64,
        size: u64,
    ) -> anyhow::Result<Vec<u8>> {
        let files = self.files.lock();
        let data = files
            .get(&(source.to_owned(), kind, file_id))
            .ok_or_else(|| anyhow!("replica {source} unreachable"))?;
        let start = (offset as usize).min(data.len());
        let end = (start + size as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }
}

#[async_trait]
impl RepairFetcher for FakeFetcher {
    async fn fetch(
        &self,
        source: &str,
        kind: StoreKind,
        file_id: FileId,
        offset: u64,
        size: u64,
    ) -> anyhow::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        let result = self.read(source, kind, file_id, offset, size);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
