//! Embedded key-value store handle backing the control-plane components.
//!
//! Thin typed wrapper over sled: values are bincode-encoded serde records.
//! Opening the store is the one operation treated as fail-fast by bootstrap
//! code, since a broken store makes every dependent component unusable.


use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::Result;
use crate::SetupError;
use crate::StoreError;

pub struct KvStore {
    name: String,
    db: sled::Db,
}

impl KvStore {
    /// Open a persistent store rooted at `path`.
    pub fn open(
        name: &str,
        path: &Path,
    ) -> Result<Self> {
        let db = sled::open(path).map_err(|source| SetupError::KvOpen {
            name: name.to_string(),
            source,
        })?;
        debug!("opened kv store '{}' at {}", name, path.display());
        Ok(Self {
            name: name.to_string(),
            db,
        })
    }

    /// Open an in-memory store that is discarded on drop. Used by test runs.
    pub fn open_temporary(name: &str) -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|source| SetupError::KvOpen {
                name: name.to_string(),
                source,
            })?;
        Ok(Self {
            name: name.to_string(),
            db,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put<T: Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let bytes = bincode::serialize(value).map_err(StoreError::from)?;
        self.db.insert(key, bytes).map_err(StoreError::from)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>> {
        match self.db.get(key).map_err(StoreError::from)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    pub fn delete(
        &self,
        key: &str,
    ) -> Result<()> {
        self.db.remove(key).map_err(StoreError::from)?;
        Ok(())
    }

    /// Collect every record whose key starts with `prefix`, in key order.
    pub fn scan_prefix<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (_, bytes) = entry.map_err(StoreError::from)?;
            records.push(bincode::deserialize(&bytes).map_err(StoreError::from)?);
        }
        Ok(records)
    }
}
