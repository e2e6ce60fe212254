//! Storage-policy store.
//!
//! Policies are named volume-spec templates persisted in the kv store; the
//! management gateway applies the default policy to volume creation requests
//! that leave their spec empty.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::constants::DEFAULT_POLICY_KEY;
use crate::constants::POLICY_KEY_PREFIX;
use crate::proto::v1::VolumeSpec;
use crate::KvStore;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SdkPolicy {
    pub name: String,
    pub spec: VolumeSpec,
}

pub struct StoragePolicyStore {
    kv: Arc<KvStore>,
}

impl StoragePolicyStore {
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    pub fn set(
        &self,
        policy: &SdkPolicy,
    ) -> Result<()> {
        self.kv
            .put(&format!("{}{}", POLICY_KEY_PREFIX, policy.name), policy)
    }

    pub fn inspect(
        &self,
        name: &str,
    ) -> Result<Option<SdkPolicy>> {
        self.kv.get(&format!("{}{}", POLICY_KEY_PREFIX, name))
    }

    /// Mark `name` as the default policy applied to empty creation specs.
    pub fn set_default(
        &self,
        name: &str,
    ) -> Result<()> {
        info!("setting default storage policy to '{}'", name);
        self.kv.put(DEFAULT_POLICY_KEY, &name.to_string())
    }

    pub fn default_policy(&self) -> Result<Option<SdkPolicy>> {
        match self.kv.get::<String>(DEFAULT_POLICY_KEY)? {
            Some(name) => self.inspect(&name),
            None => Ok(None),
        }
    }
}
