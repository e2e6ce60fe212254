use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;
use tracing::warn;

use super::FakeDriver;
use super::VolumeDriver;
use crate::constants::FAKE_DRIVER_NAME;
use crate::DriverError;
use crate::KvStore;
use crate::Result;

/// Per-run mapping from driver name to driver instance.
///
/// Owned by the runtime context instead of living in process-global state, so
/// concurrent harness runs in one process cannot clobber each other's
/// drivers. A duplicate name is always an error; removal is idempotent and
/// safe to call for names that were never registered.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: DashMap<String, Arc<dyn VolumeDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct and register one of the built-in driver providers.
    pub fn register(
        &self,
        name: &str,
        params: &HashMap<String, String>,
        kv: Arc<KvStore>,
    ) -> Result<()> {
        let driver: Arc<dyn VolumeDriver> = match name {
            FAKE_DRIVER_NAME => Arc::new(FakeDriver::new(kv, params)),
            _ => return Err(DriverError::UnknownProvider(name.to_string()).into()),
        };
        self.add(name, driver)
    }

    /// Install an externally constructed driver instance under `name`.
    pub fn add(
        &self,
        name: &str,
        driver: Arc<dyn VolumeDriver>,
    ) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.drivers.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DriverError::AlreadyRegistered(name.to_string()).into()),
            Entry::Vacant(entry) => {
                entry.insert(driver);
                info!("registered volume driver '{}'", name);
                Ok(())
            }
        }
    }

    /// Remove `name` from the registry. Never fails: removing a driver that
    /// was never registered in this run is a no-op.
    pub fn remove(
        &self,
        name: &str,
    ) {
        if self.drivers.remove(name).is_none() {
            warn!("remove of unregistered volume driver '{}'", name);
        }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<Arc<dyn VolumeDriver>> {
        self.drivers.get(name).map(|entry| entry.value().clone())
    }
}
