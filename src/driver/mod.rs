//! Pluggable storage-driver backend.
//!
//! [`VolumeDriver`] is the seam the management gateway programs against;
//! [`FakeDriver`] is the kv-backed in-memory implementation used for cluster
//! bootstrap and conformance runs. The per-run [`DriverRegistry`] maps driver
//! names to instances; name collisions are an error, never a silent
//! overwrite, since multiple harness runs may share one process.

mod fake;
mod registry;
pub use fake::*;
pub use registry::*;

#[cfg(test)]
mod fake_test;

//---
#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::proto::v1::Status;
use crate::proto::v1::Volume;
use crate::proto::v1::VolumeLocator;
use crate::proto::v1::VolumeSpec;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait VolumeDriver: Send + Sync {
    fn name(&self) -> &str;

    fn status(&self) -> Status;

    /// Create a volume; the locator name must be unique per driver.
    async fn create(
        &self,
        locator: VolumeLocator,
        spec: VolumeSpec,
    ) -> Result<String>;

    /// Inspect volumes by id. An empty id list enumerates all volumes.
    async fn inspect(
        &self,
        volume_ids: Vec<String>,
    ) -> Result<Vec<Volume>>;

    async fn delete(
        &self,
        volume_id: String,
    ) -> Result<()>;
}
