//! Protocol gateway (CSI-facing server) lifecycle.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::CompressionEncoding;
use tonic_health::server::health_reporter;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::connect_uds;
use super::csi_service::CsiIdentity;
use super::ensure_tcp;
use super::normalize_address;
use super::SDK_DIAL_TIMEOUT;
use crate::proto::v1::cluster_service_client::ClusterServiceClient;
use crate::proto::v1::identity_service_server::IdentityServiceServer;
use crate::Cluster;
use crate::GatewayError;
use crate::Result;

/// Construction-time configuration of the protocol gateway.
pub struct CsiServerConfig {
    pub driver_name: String,
    pub net: String,
    pub address: String,
    /// Local handle on the cluster this gateway fronts.
    pub cluster: Arc<dyn Cluster>,
    /// Socket of the management gateway this gateway proxies probes to.
    pub sdk_socket: PathBuf,
}

/// The protocol gateway: the identity surface a conformance suite talks to.
///
/// Startup dials the management gateway's local socket exactly once; the
/// management gateway must already be serving when `start` is called.
pub struct CsiServer {
    driver_name: String,
    address: String,
    cluster: Arc<dyn Cluster>,
    sdk_socket: PathBuf,
    shutdown_tx: watch::Sender<()>,
    bound_addr: Option<SocketAddr>,
}

impl CsiServer {
    pub fn new(config: CsiServerConfig) -> Result<Self> {
        ensure_tcp(&config.net)?;
        if config.driver_name.is_empty() {
            return Err(GatewayError::DriverNotRegistered(String::new()).into());
        }
        let (shutdown_tx, _) = watch::channel(());
        Ok(Self {
            driver_name: config.driver_name,
            address: normalize_address(&config.address),
            cluster: config.cluster,
            sdk_socket: config.sdk_socket,
            shutdown_tx,
            bound_addr: None,
        })
    }

    /// Binds the TCP listener, dials the management gateway socket and spawns
    /// the serving loop. Fails if the socket cannot be dialed within the dial
    /// timeout; the dial is not retried.
    pub async fn start(&mut self) -> Result<()> {
        let tcp = TcpListener::bind(&self.address)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.address.clone(),
                source,
            })?;
        let bound_addr = tcp.local_addr().map_err(|source| GatewayError::Bind {
            addr: self.address.clone(),
            source,
        })?;

        let channel = connect_uds(&self.sdk_socket, SDK_DIAL_TIMEOUT)
            .await
            .map_err(|source| GatewayError::SdkDial {
                path: self.sdk_socket.clone(),
                source: Box::new(source),
            })?;
        let sdk = ClusterServiceClient::new(channel);

        // Readiness is served through the proxy; the local handle only
        // informs the startup log.
        match self.cluster.enumerate().await {
            Ok(info) => info!(
                "protocol gateway fronting cluster {} (status {:?})",
                info.id,
                info.status()
            ),
            Err(e) => warn!("cluster status unavailable at gateway start: {}", e),
        }

        self.bound_addr = Some(bound_addr);

        let identity = CsiIdentity::new(self.driver_name.clone(), sdk);
        let (mut health_reporter, health_service) = health_reporter();
        health_reporter
            .set_serving::<IdentityServiceServer<CsiIdentity>>()
            .await;

        let router = tonic::transport::Server::builder()
            .tcp_nodelay(true)
            .add_service(health_service)
            .add_service(
                IdentityServiceServer::new(identity)
                    .accept_compressed(CompressionEncoding::Gzip)
                    .send_compressed(CompressionEncoding::Gzip),
            );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = router
                .serve_with_incoming_shutdown(
                    TcpListenerStream::new(tcp),
                    shutdown_rx.changed().map(move |_| {
                        warn!("Stopping protocol gateway on {}", bound_addr);
                    }),
                )
                .await
            {
                error!("protocol gateway stopped serving: {:?}", e);
            }
        });

        info!(
            "protocol gateway started: driver={} tcp={}",
            self.driver_name, bound_addr
        );
        Ok(())
    }

    /// The bound TCP address, as `host:port`.
    pub fn address(&self) -> Result<String> {
        self.bound_addr
            .map(|a| a.to_string())
            .ok_or_else(|| GatewayError::NotStarted.into())
    }

    /// Signals the serving loop to drain. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
