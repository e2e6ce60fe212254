//! Protocol gateway identity service, proxying readiness to the management
//! gateway over its local socket.

use autometrics::autometrics;
use tonic::Request;
use tonic::Response;
use tonic::Status;
use tracing::debug;

use crate::constants::PLUGIN_NAME;
use crate::constants::PLUGIN_VERSION;
use crate::proto::v1;
use crate::proto::v1::cluster_service_client::ClusterServiceClient;
use crate::proto::v1::identity_service_server::IdentityService;
use crate::proto::v1::ClusterEnumerateRequest;
use crate::proto::v1::GetPluginInfoRequest;
use crate::proto::v1::GetPluginInfoResponse;
use crate::proto::v1::ProbeRequest;
use crate::proto::v1::ProbeResponse;
use crate::API_SLO;

#[derive(Clone)]
pub(crate) struct CsiIdentity {
    driver_name: String,
    sdk: ClusterServiceClient<tonic::transport::Channel>,
}

impl CsiIdentity {
    pub(crate) fn new(
        driver_name: String,
        sdk: ClusterServiceClient<tonic::transport::Channel>,
    ) -> Self {
        Self { driver_name, sdk }
    }
}

#[tonic::async_trait]
impl IdentityService for CsiIdentity {
    /// Readiness is delegated to the management gateway: the probe succeeds
    /// once the cluster behind it reports OK.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn probe(
        &self,
        _request: Request<ProbeRequest>,
    ) -> std::result::Result<Response<ProbeResponse>, Status> {
        let mut client = self.sdk.clone();
        let response = client
            .enumerate(ClusterEnumerateRequest {})
            .await
            .map_err(|e| Status::unavailable(format!("management gateway unreachable: {}", e)))?;

        let ready = response
            .into_inner()
            .cluster
            .map(|c| c.status() == v1::Status::Ok)
            .unwrap_or(false);

        debug!("probe for driver '{}': ready={}", self.driver_name, ready);
        Ok(Response::new(ProbeResponse { ready }))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    async fn get_plugin_info(
        &self,
        _request: Request<GetPluginInfoRequest>,
    ) -> std::result::Result<Response<GetPluginInfoResponse>, Status> {
        Ok(Response::new(GetPluginInfoResponse {
            name: PLUGIN_NAME.to_string(),
            version: PLUGIN_VERSION.to_string(),
        }))
    }
}
