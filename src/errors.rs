//! Storage Control-Plane Error Hierarchy
//!
//! Defines the error types for the gateway stack, categorized by setup,
//! storage, driver, gateway lifecycle, readiness and conformance concerns.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bootstrap failures that make the whole run unusable
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Key-value store failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Volume driver and registry failures
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Gateway construction and lifecycle failures
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Cluster readiness gate failures
    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    /// Conformance driver failures
    #[error(transparent)]
    Sanity(#[from] SanityError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unrecoverable failures requiring the run to abort
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Environment-level failures during bootstrap. Callers wiring up a test run
/// treat these as fail-fast: a broken store or cluster context makes every
/// dependent component unusable.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Failed to open key-value store '{name}': {source}")]
    KvOpen {
        name: String,
        #[source]
        source: sled::Error,
    },

    #[error("Cluster context has not been initialized")]
    ClusterNotInitialized,

    #[error("Failed to initialize cluster manager: {0}")]
    ClusterInit(String),
}

#[derive(Debug, thiserror::Error)]
#[doc(hidden)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] sled::Error),

    #[error("Failed to encode/decode record: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Driver '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("No built-in driver provider named '{0}'")]
    UnknownProvider(String),

    #[error("Driver '{0}' is not registered")]
    NotFound(String),

    #[error("Volume '{0}' not found")]
    VolumeNotFound(String),

    #[error("Volume named '{0}' already exists")]
    VolumeExists(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Resolving the configured driver name against the registry failed
    #[error("Driver '{0}' must be registered before the gateway starts")]
    DriverNotRegistered(String),

    #[error("Unsupported network kind '{0}'")]
    UnsupportedNet(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind REST port {port}: {source}")]
    RestBind {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to prepare socket path {path}: {source}")]
    SocketPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The protocol gateway dials the management gateway's socket during its
    /// own startup; callers do not retry this dial.
    #[error("Failed to dial management gateway socket {path}: {source}")]
    SdkDial {
        path: PathBuf,
        #[source]
        source: Box<tonic::transport::Error>,
    },

    #[error("Gateway has not been started")]
    NotStarted,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    /// The deadline elapsed with no OK status observed
    #[error("Cluster did not become ready within {waited:?}")]
    Timeout { waited: Duration },

    /// A status enumeration call itself failed: setup bug, not retried
    #[error("Unable to get cluster status: {0}")]
    Enumerate(#[source] Box<Error>),
}

#[derive(Debug, thiserror::Error)]
pub enum SanityError {
    #[error("Failed to provision target directory: {0}")]
    Provision(#[from] std::io::Error),

    #[error("Target directory {0} missing after provisioning")]
    TargetMissing(PathBuf),

    #[error("Failed to connect to gateway at {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("Gateway health check reported not-serving")]
    NotServing,

    #[error("Identity probe reported not ready")]
    NotReady,

    #[error("Identity check failed: {0}")]
    Identity(String),
}
