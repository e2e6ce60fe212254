// -
// Driver registry names

/// Built-in driver provider registered for cluster bootstrap.
pub const FAKE_DRIVER_NAME: &str = "fake";
/// Name under which the harness installs its interaction-recording driver.
pub const MOCK_DRIVER_NAME: &str = "mock";

// -
// Key-value store namespaces

/// Sled entry key prefixes
pub(crate) const CLUSTER_KEY_PREFIX: &str = "cluster/";
pub(crate) const NODE_KEY_PREFIX: &str = "node/";
pub(crate) const VOLUME_KEY_PREFIX: &str = "volume/";
pub(crate) const POLICY_KEY_PREFIX: &str = "policy/";
pub(crate) const DEFAULT_POLICY_KEY: &str = "policy/_default";

// -
// Identity surface

pub(crate) const PLUGIN_NAME: &str = "volgate.csi";
pub(crate) const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");
