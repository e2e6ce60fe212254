//! Cluster membership management.
//!
//! [`Cluster`] is the seam consumed by both gateways and by the readiness
//! gate; [`ClusterManager`] is the single-node implementation used for
//! bootstrap. Interaction-based tests substitute the generated `MockCluster`.

mod manager;
pub use manager::*;


//---
#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::proto::v1::ClusterInfo;
use crate::proto::v1::NodeInfo;
use crate::Result;

/// Membership and status surface of the cluster manager.
///
/// `start` runs the bootstrap sequence to completion; callers that want it
/// concurrent with the rest of their setup spawn it on a background task and
/// join through the readiness gate, not through direct signaling.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn start(&self) -> Result<()>;

    /// Enumerate the cluster: id, current node and per-node status.
    async fn enumerate(&self) -> Result<ClusterInfo>;

    async fn inspect_current(&self) -> Result<NodeInfo>;

    /// Best-effort, idempotent shutdown.
    async fn shutdown(&self);
}
