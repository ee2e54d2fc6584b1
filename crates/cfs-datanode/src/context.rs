use std::fmt;
use std::sync::Arc;

use crate::config::DataNodeConfig;
use crate::membership::{MasterClient, MembershipResolver};
use crate::repair::RepairFetcher;

pub type SharedNodeContext = Arc<NodeContext>;

/// State shared by every partition hosted on this node
pub struct NodeContext {
    config: DataNodeConfig,
    resolver: Arc<dyn MembershipResolver>,
    fetcher: Arc<dyn RepairFetcher>,
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("config", &self.config)
            .finish()
    }
}

impl NodeContext {
    pub fn new(
        config: DataNodeConfig,
        resolver: Arc<dyn MembershipResolver>,
        fetcher: Arc<dyn RepairFetcher>,
    ) -> Self {
        Self {
            config,
            resolver,
            fetcher,
        }
    }

    pub fn shared(
        config: DataNodeConfig,
        resolver: Arc<dyn MembershipResolver>,
        fetcher: Arc<dyn RepairFetcher>,
    ) -> SharedNodeContext {
        Arc::new(Self::new(config, resolver, fetcher))
    }

    /// context resolving membership through the configured masters
    pub fn with_master(
        config: DataNodeConfig,
        fetcher: Arc<dyn RepairFetcher>,
    ) -> SharedNodeContext {
        let resolver = Arc::new(MasterClient::from_config(&config));
        Self::shared(config, resolver, fetcher)
    }

    pub fn config(&self) -> &DataNodeConfig {
        &self.config
    }

    pub fn local_ip(&self) -> &str {
        &self.config.local_ip
    }

    pub fn resolver(&self) -> &dyn MembershipResolver {
        self.resolver.as_ref()
    }

    pub fn fetcher(&self) -> &dyn RepairFetcher {
        self.fetcher.as_ref()
    }
}
