//! Conformance driver.
//!
//! Runs the preparatory checks a conformance suite makes against the
//! protocol gateway: provision the target directory tree, confirm the
//! gateway serves and passes a gRPC health check, then confirm the identity
//! surface reports a name, a version and readiness. Failures surface as
//! [`SanityError`] for the surrounding test to assert on.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use tonic::transport::Channel;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tracing::info;

use crate::proto::v1::identity_service_client::IdentityServiceClient;
use crate::proto::v1::GetPluginInfoRequest;
use crate::proto::v1::ProbeRequest;
use crate::Result;
use crate::SanityError;

pub type CreateTargetDir = Box<dyn Fn(&Path) -> io::Result<PathBuf> + Send + Sync>;

/// Conformance run parameters.
///
/// `create_target_dir` provisions the mount tree; [`default_target_dir`] is
/// the stock callback. The callback must be idempotent, a re-run against an
/// existing tree provisions nothing and succeeds.
pub struct Config {
    /// `host:port` of the protocol gateway.
    pub address: String,
    pub target_path: PathBuf,
    pub create_target_dir: CreateTargetDir,
}

/// Stock provisioning callback: the path itself plus a nested `target`
/// subdirectory, both mode 0o755.
pub fn default_target_dir() -> CreateTargetDir {
    Box::new(|p: &Path| {
        create_dir_0755(p)?;
        let target = p.join("target");
        create_dir_0755(&target)?;
        Ok(target)
    })
}

fn create_dir_0755(p: &Path) -> io::Result<()> {
    fs::create_dir_all(p)?;
    fs::set_permissions(p, fs::Permissions::from_mode(0o755))
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(config: &Config) -> Result<()> {
    info!(
        "conformance run against {} (target {})",
        config.address,
        config.target_path.display()
    );

    let target = (config.create_target_dir)(&config.target_path).map_err(SanityError::Provision)?;
    if !target.is_dir() {
        return Err(SanityError::TargetMissing(target).into());
    }

    let channel = connect(&config.address).await?;

    check_health(channel.clone(), &config.address).await?;
    check_identity(channel).await?;

    info!("conformance run against {} passed", config.address);
    Ok(())
}

async fn connect(address: &str) -> Result<Channel> {
    Channel::from_shared(format!("http://{}", address))
        .map_err(|e| SanityError::Connect {
            address: address.to_string(),
            reason: e.to_string(),
        })?
        .connect_timeout(CONNECT_TIMEOUT)
        .connect()
        .await
        .map_err(|e| {
            SanityError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

/// Health check against the whole server (empty service name).
async fn check_health(
    channel: Channel,
    address: &str,
) -> Result<()> {
    let mut client = HealthClient::new(channel);
    let response = client
        .check(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .map_err(|e| SanityError::Connect {
            address: address.to_string(),
            reason: e.to_string(),
        })?
        .into_inner();

    if response.status != ServingStatus::Serving as i32 {
        return Err(SanityError::NotServing.into());
    }
    Ok(())
}

async fn check_identity(channel: Channel) -> Result<()> {
    let mut client = IdentityServiceClient::new(channel);

    let info = client
        .get_plugin_info(GetPluginInfoRequest {})
        .await
        .map_err(|e| SanityError::Identity(e.to_string()))?
        .into_inner();
    if info.name.is_empty() || info.version.is_empty() {
        return Err(SanityError::Identity("empty plugin name or version".to_string()).into());
    }

    let probe = client
        .probe(ProbeRequest {})
        .await
        .map_err(|e| SanityError::Identity(e.to_string()))?
        .into_inner();
    if !probe.ready {
        return Err(SanityError::NotReady.into());
    }
    Ok(())
}

#[cfg(test)]
mod sanity_test;
