use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;
use tonic::async_trait;
use tracing::info;
use tracing::warn;

use super::Cluster;
use crate::constants::CLUSTER_KEY_PREFIX;
use crate::constants::NODE_KEY_PREFIX;
use crate::proto::v1::ClusterInfo;
use crate::proto::v1::NodeInfo;
use crate::proto::v1::Status;
use crate::ClusterConfig;
use crate::KvStore;
use crate::Result;

#[derive(Debug, Serialize, Deserialize)]
struct ClusterRecord {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: String,
    mgmt_ip: String,
}

/// Single-node cluster manager.
///
/// Construction only captures the configuration; the bootstrap sequence runs
/// in [`Cluster::start`], which persists the cluster and node records and
/// transitions status Init -> Ok. Until `start` completes, `enumerate`
/// reports the pre-ready status, which is what the readiness gate polls.
pub struct ClusterManager {
    config: ClusterConfig,
    kv: Arc<KvStore>,
    status: RwLock<Status>,
}

impl ClusterManager {
    pub fn new(
        config: ClusterConfig,
        kv: Arc<KvStore>,
    ) -> Self {
        Self {
            config,
            kv,
            status: RwLock::new(Status::None),
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        *self.status.read()
    }

    fn set_status(
        &self,
        status: Status,
    ) {
        *self.status.write() = status;
    }

    fn node_key(&self) -> String {
        format!("{}{}", NODE_KEY_PREFIX, self.config.node_id)
    }
}

#[async_trait]
impl Cluster for ClusterManager {
    async fn start(&self) -> Result<()> {
        info!(
            "starting cluster manager: cluster_id={} node_id={}",
            self.config.cluster_id, self.config.node_id
        );
        self.set_status(Status::Init);

        self.kv.put(
            &format!("{}{}", CLUSTER_KEY_PREFIX, self.config.cluster_id),
            &ClusterRecord {
                id: self.config.cluster_id.clone(),
            },
        )?;
        self.kv.put(
            &self.node_key(),
            &NodeRecord {
                id: self.config.node_id.clone(),
                mgmt_ip: "127.0.0.1".to_string(),
            },
        )?;

        // Let concurrent pollers observe the pre-ready phase
        tokio::task::yield_now().await;

        self.set_status(Status::Ok);
        info!("cluster manager is ready: {}", self.config.cluster_id);
        Ok(())
    }

    async fn enumerate(&self) -> Result<ClusterInfo> {
        let status = self.status();
        let records: Vec<NodeRecord> = self.kv.scan_prefix(NODE_KEY_PREFIX)?;
        let nodes = records
            .into_iter()
            .map(|r| NodeInfo {
                id: r.id,
                mgmt_ip: r.mgmt_ip,
                status: status.into(),
            })
            .collect();

        Ok(ClusterInfo {
            id: self.config.cluster_id.clone(),
            node_id: self.config.node_id.clone(),
            status: status.into(),
            nodes,
        })
    }

    async fn inspect_current(&self) -> Result<NodeInfo> {
        let record: Option<NodeRecord> = self.kv.get(&self.node_key())?;
        Ok(match record {
            Some(r) => NodeInfo {
                id: r.id,
                mgmt_ip: r.mgmt_ip,
                status: self.status().into(),
            },
            None => NodeInfo {
                id: self.config.node_id.clone(),
                mgmt_ip: String::new(),
                status: self.status().into(),
            },
        })
    }

    async fn shutdown(&self) {
        if self.status() == Status::Offline {
            return;
        }
        warn!("shutting down cluster manager: {}", self.config.cluster_id);
        self.set_status(Status::Offline);
    }
}
