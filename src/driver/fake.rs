use std::collections::HashMap;
use std::sync::Arc;

use nanoid::nanoid;
use tonic::async_trait;
use tracing::debug;

use super::VolumeDriver;
use crate::constants::FAKE_DRIVER_NAME;
use crate::constants::VOLUME_KEY_PREFIX;
use crate::metrics::VOLUME_OPS_TOTAL;
use crate::proto::v1::Status;
use crate::proto::v1::Volume;
use crate::proto::v1::VolumeLocator;
use crate::proto::v1::VolumeSpec;
use crate::DriverError;
use crate::KvStore;
use crate::Result;

/// In-memory driver backed by the run's kv store.
///
/// Volume records live under `volume/{id}`; nothing is attached or mounted
/// for real, which is exactly what bootstrap and conformance runs need.
pub struct FakeDriver {
    kv: Arc<KvStore>,
}

impl FakeDriver {
    pub fn new(
        kv: Arc<KvStore>,
        params: &HashMap<String, String>,
    ) -> Self {
        if !params.is_empty() {
            debug!("fake driver ignores params: {:?}", params);
        }
        Self { kv }
    }

    fn volume_key(id: &str) -> String {
        format!("{}{}", VOLUME_KEY_PREFIX, id)
    }
}

#[async_trait]
impl VolumeDriver for FakeDriver {
    fn name(&self) -> &str {
        FAKE_DRIVER_NAME
    }

    fn status(&self) -> Status {
        Status::Ok
    }

    async fn create(
        &self,
        locator: VolumeLocator,
        spec: VolumeSpec,
    ) -> Result<String> {
        let existing: Vec<Volume> = self.kv.scan_prefix(VOLUME_KEY_PREFIX)?;
        if existing
            .iter()
            .any(|v| v.locator.as_ref().map(|l| l.name.as_str()) == Some(locator.name.as_str()))
        {
            return Err(DriverError::VolumeExists(locator.name).into());
        }

        let id = nanoid!();
        let volume = Volume {
            id: id.clone(),
            locator: Some(locator),
            spec: Some(spec),
            status: Status::Ok.into(),
        };
        self.kv.put(&Self::volume_key(&id), &volume)?;

        VOLUME_OPS_TOTAL.with_label_values(&["create"]).inc();
        debug!("fake driver created volume {}", id);
        Ok(id)
    }

    async fn inspect(
        &self,
        volume_ids: Vec<String>,
    ) -> Result<Vec<Volume>> {
        VOLUME_OPS_TOTAL.with_label_values(&["inspect"]).inc();

        if volume_ids.is_empty() {
            return self.kv.scan_prefix(VOLUME_KEY_PREFIX);
        }

        let mut volumes = Vec::with_capacity(volume_ids.len());
        for id in volume_ids {
            match self.kv.get::<Volume>(&Self::volume_key(&id))? {
                Some(volume) => volumes.push(volume),
                None => return Err(DriverError::VolumeNotFound(id).into()),
            }
        }
        Ok(volumes)
    }

    async fn delete(
        &self,
        volume_id: String,
    ) -> Result<()> {
        let key = Self::volume_key(&volume_id);
        if self.kv.get::<Volume>(&key)?.is_none() {
            return Err(DriverError::VolumeNotFound(volume_id).into());
        }
        self.kv.delete(&key)?;

        VOLUME_OPS_TOTAL.with_label_values(&["delete"]).inc();
        debug!("fake driver deleted volume {}", volume_id);
        Ok(())
    }
}
