//! Per-run context replacing process-wide singletons.
//!
//! The original stack kept the key-value store, the cluster manager and the
//! driver registry in process-global state; here they hang off an explicit
//! [`Runtime`] constructed once per run and passed by handle to every
//! component that needs one. This removes cross-run driver-name collisions
//! while keeping the original contracts: replacing the store is always
//! allowed, and re-initializing the cluster context never fails, the later
//! configuration silently superseding the earlier one.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use arc_swap::ArcSwapOption;
use tracing::info;

use crate::ClusterConfig;
use crate::ClusterManager;
use crate::DriverRegistry;
use crate::KvStore;
use crate::Result;
use crate::SetupError;

pub struct Runtime {
    kv: ArcSwap<KvStore>,
    cluster: ArcSwapOption<ClusterManager>,
    drivers: DriverRegistry,
}

impl Runtime {
    pub fn new(kv: KvStore) -> Arc<Self> {
        Arc::new(Self {
            kv: ArcSwap::from_pointee(kv),
            cluster: ArcSwapOption::const_empty(),
            drivers: DriverRegistry::new(),
        })
    }

    /// Replace the active key-value store handle. Components constructed
    /// after this call see the new store; already-built ones keep the handle
    /// they were given.
    pub fn set_kv(
        &self,
        kv: KvStore,
    ) {
        self.kv.store(Arc::new(kv));
    }

    pub fn kv(&self) -> Arc<KvStore> {
        self.kv.load_full()
    }

    /// Initialize or re-initialize the cluster manager for this run.
    ///
    /// Calling this twice is explicitly supported: the new configuration
    /// replaces the old manager, modeling repeated suite invocations in one
    /// process.
    pub fn init_cluster(
        &self,
        config: ClusterConfig,
    ) -> Result<Arc<ClusterManager>> {
        config
            .validate()
            .map_err(|e| SetupError::ClusterInit(e.to_string()))?;

        info!(
            "initializing cluster context: cluster_id={} node_id={}",
            config.cluster_id, config.node_id
        );
        let manager = Arc::new(ClusterManager::new(config, self.kv()));
        self.cluster.store(Some(manager.clone()));
        Ok(manager)
    }

    /// The active cluster manager, or `SetupError::ClusterNotInitialized`
    /// when `init_cluster` was never called on this context.
    pub fn cluster(&self) -> Result<Arc<ClusterManager>> {
        self.cluster
            .load_full()
            .ok_or_else(|| SetupError::ClusterNotInitialized.into())
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    /// Register a built-in driver provider against the current store.
    pub fn register_driver(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<()> {
        self.drivers.register(name, params, self.kv())
    }
}
