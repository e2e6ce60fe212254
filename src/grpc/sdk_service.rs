//! Management gateway service implementations.

use std::io::Write;
use std::sync::Arc;

use autometrics::autometrics;
use tonic::Request;
use tonic::Response;
use tonic::Status;
use tracing::debug;

use super::LogSink;
use crate::proto::v1::cluster_service_server::ClusterService;
use crate::proto::v1::volume_service_server::VolumeService;
use crate::proto::v1::ClusterEnumerateRequest;
use crate::proto::v1::ClusterEnumerateResponse;
use crate::proto::v1::ClusterInspectCurrentRequest;
use crate::proto::v1::ClusterInspectCurrentResponse;
use crate::proto::v1::VolumeCreateRequest;
use crate::proto::v1::VolumeCreateResponse;
use crate::proto::v1::VolumeDeleteRequest;
use crate::proto::v1::VolumeDeleteResponse;
use crate::proto::v1::VolumeInspectRequest;
use crate::proto::v1::VolumeInspectResponse;
use crate::Cluster;
use crate::DriverError;
use crate::Error;
use crate::StoragePolicyStore;
use crate::VolumeDriver;
use crate::API_SLO;

#[derive(Clone)]
pub(crate) struct SdkService {
    cluster: Arc<dyn Cluster>,
    driver: Arc<dyn VolumeDriver>,
    policy: Arc<StoragePolicyStore>,
    access: LogSink,
}

impl SdkService {
    pub(crate) fn new(
        cluster: Arc<dyn Cluster>,
        driver: Arc<dyn VolumeDriver>,
        policy: Arc<StoragePolicyStore>,
        access: LogSink,
    ) -> Self {
        Self {
            cluster,
            driver,
            policy,
            access,
        }
    }

    fn access_log(
        &self,
        method: &str,
    ) {
        let mut sink = self.access.lock();
        let _ = writeln!(sink, "access: {}", method);
    }
}

fn to_status(err: Error) -> Status {
    match err {
        Error::Driver(DriverError::VolumeNotFound(id)) => {
            Status::not_found(format!("volume '{}' not found", id))
        }
        Error::Driver(DriverError::VolumeExists(name)) => {
            Status::already_exists(format!("volume named '{}' already exists", name))
        }
        other => Status::internal(other.to_string()),
    }
}

#[tonic::async_trait]
impl ClusterService for SdkService {
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn enumerate(
        &self,
        _request: Request<ClusterEnumerateRequest>,
    ) -> std::result::Result<Response<ClusterEnumerateResponse>, Status> {
        self.access_log("ClusterService.Enumerate");
        let cluster = self.cluster.enumerate().await.map_err(to_status)?;
        Ok(Response::new(ClusterEnumerateResponse {
            cluster: Some(cluster),
        }))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn inspect_current(
        &self,
        _request: Request<ClusterInspectCurrentRequest>,
    ) -> std::result::Result<Response<ClusterInspectCurrentResponse>, Status> {
        self.access_log("ClusterService.InspectCurrent");
        let node = self.cluster.inspect_current().await.map_err(to_status)?;
        Ok(Response::new(ClusterInspectCurrentResponse { node: Some(node) }))
    }
}

#[tonic::async_trait]
impl VolumeService for SdkService {
    /// Creates a volume through the configured driver. An empty creation
    /// spec falls back to the default storage policy, when one is set.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn create(
        &self,
        request: Request<VolumeCreateRequest>,
    ) -> std::result::Result<Response<VolumeCreateResponse>, Status> {
        self.access_log("VolumeService.Create");
        let request = request.into_inner();

        let locator = request
            .locator
            .ok_or_else(|| Status::invalid_argument("locator must be provided"))?;
        if locator.name.is_empty() {
            return Err(Status::invalid_argument("locator name must be provided"));
        }

        let spec = match request.spec {
            Some(spec) if spec.size > 0 => spec,
            _ => match self.policy.default_policy().map_err(to_status)? {
                Some(policy) => {
                    debug!("applying default storage policy '{}'", policy.name);
                    policy.spec
                }
                None => return Err(Status::invalid_argument("spec size must be non-zero")),
            },
        };

        let volume_id = self.driver.create(locator, spec).await.map_err(to_status)?;
        Ok(Response::new(VolumeCreateResponse { volume_id }))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn inspect(
        &self,
        request: Request<VolumeInspectRequest>,
    ) -> std::result::Result<Response<VolumeInspectResponse>, Status> {
        self.access_log("VolumeService.Inspect");
        let volumes = self
            .driver
            .inspect(request.into_inner().volume_ids)
            .await
            .map_err(to_status)?;
        Ok(Response::new(VolumeInspectResponse { volumes }))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn delete(
        &self,
        request: Request<VolumeDeleteRequest>,
    ) -> std::result::Result<Response<VolumeDeleteResponse>, Status> {
        self.access_log("VolumeService.Delete");
        self.driver
            .delete(request.into_inner().volume_id)
            .await
            .map_err(to_status)?;
        Ok(Response::new(VolumeDeleteResponse {}))
    }
}
