//! Configuration surface for the gateway stack and its test harness.
//!
//! Provides serde-deserializable config structs with per-field defaults and
//! `validate()` checks, plus layered loading of harness settings:
//! 1. Default values (hardcoded)
//! 2. Optional `volgate.toml` in the working directory
//! 3. Environment variables with the `VOLGATE` prefix (highest priority)

mod cluster;
mod readiness;
pub use cluster::*;
pub use readiness::*;


//---
use std::path::PathBuf;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Settings consumed by the bootstrap harness and integration tests.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HarnessSettings {
    /// Mount target provisioned for the conformance run
    #[serde(default = "default_target_path")]
    pub target_path: PathBuf,

    /// Directory holding the per-run management gateway socket
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Readiness gate parameters
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            target_path: default_target_path(),
            socket_dir: default_socket_dir(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl HarnessSettings {
    /// Load settings from the optional config file and environment overrides.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("volgate").required(false))
            .add_source(
                Environment::with_prefix("VOLGATE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

fn default_target_path() -> PathBuf {
    PathBuf::from("/tmp/mnt/csi")
}
fn default_socket_dir() -> PathBuf {
    PathBuf::from("/tmp")
}
