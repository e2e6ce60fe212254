use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Identifies the logical cluster instance for the process.
///
/// Immutable once passed to cluster bootstrap; re-initializing the runtime
/// context with a new `ClusterConfig` replaces the previous one wholesale.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    #[serde(default = "default_cluster_id")]
    pub cluster_id: String,

    #[serde(default = "default_node_id")]
    pub node_id: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_id: default_cluster_id(),
            node_id: default_node_id(),
        }
    }
}

impl ClusterConfig {
    /// Validates cluster configuration consistency
    /// # Errors
    /// Returns `Error::InvalidConfig` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if self.cluster_id.is_empty() {
            return Err(Error::InvalidConfig("cluster_id cannot be empty".into()));
        }

        if self.node_id.is_empty() {
            return Err(Error::InvalidConfig("node_id cannot be empty".into()));
        }

        // Ids end up embedded in kv keys; a separator would alias namespaces
        if self.cluster_id.contains('/') || self.node_id.contains('/') {
            return Err(Error::InvalidConfig(
                "cluster_id and node_id cannot contain '/'".into(),
            ));
        }

        Ok(())
    }
}

fn default_cluster_id() -> String {
    "volgate-cluster".to_string()
}
fn default_node_id() -> String {
    "node-1".to_string()
}
