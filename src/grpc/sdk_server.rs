//! Management gateway (SDK server) lifecycle.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::net::TcpListener;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::codec::CompressionEncoding;
use tonic::service::interceptor::InterceptedService;
use tonic_health::server::health_reporter;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ensure_tcp;
use super::normalize_address;
use super::rest_gateway;
use super::sdk_service::SdkService;
use super::LogSink;
use crate::proto::v1::cluster_service_server::ClusterServiceServer;
use crate::proto::v1::volume_service_server::VolumeServiceServer;
use crate::AuthInterceptor;
use crate::Cluster;
use crate::GatewayError;
use crate::Result;
use crate::Runtime;
use crate::SecurityConfig;
use crate::StoragePolicyStore;

/// Construction-time configuration of the management gateway.
///
/// `security` defaults to absent; when absent, no authentication is enforced
/// and nothing else changes.
pub struct SdkServerConfig {
    pub driver_name: String,
    pub net: String,
    pub address: String,
    pub rest_port: u16,
    pub cluster: Arc<dyn Cluster>,
    pub socket: PathBuf,
    pub storage_policy: Arc<StoragePolicyStore>,
    pub access_output: LogSink,
    pub audit_output: LogSink,
    pub security: Option<Arc<SecurityConfig>>,
}

/// The management gateway: one gRPC surface served on TCP and on a local
/// socket, plus a REST port for status and metrics.
///
/// The local socket is the coupling point for the protocol gateway, which
/// dials it during its own startup; `start` must therefore have returned
/// before the protocol gateway is started.
pub struct SdkServer {
    address: String,
    rest_port: u16,
    socket: PathBuf,
    service: SdkService,
    interceptor: AuthInterceptor,
    cluster: Arc<dyn Cluster>,
    shutdown_tx: watch::Sender<()>,
    bound_addr: Option<SocketAddr>,
}

impl SdkServer {
    /// Builds the gateway, resolving the configured driver name against the
    /// runtime's registry. The driver must already be registered.
    pub fn new(
        config: SdkServerConfig,
        runtime: &Runtime,
    ) -> Result<Self> {
        ensure_tcp(&config.net)?;

        let driver = runtime
            .drivers()
            .get(&config.driver_name)
            .ok_or_else(|| GatewayError::DriverNotRegistered(config.driver_name.clone()))?;

        let service = SdkService::new(
            config.cluster.clone(),
            driver,
            config.storage_policy,
            config.access_output,
        );
        let interceptor = AuthInterceptor::new(config.security, config.audit_output);
        let (shutdown_tx, _) = watch::channel(());

        Ok(Self {
            address: normalize_address(&config.address),
            rest_port: config.rest_port,
            socket: config.socket,
            service,
            interceptor,
            cluster: config.cluster,
            shutdown_tx,
            bound_addr: None,
        })
    }

    /// Binds the TCP, unix-socket and REST listeners and spawns the serving
    /// loops. Returns once every listener is bound.
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
        self.bound_addr = Some(bound_addr);

        // A stale socket from a crashed run would make the bind fail
        if self.socket.exists() {
            warn!("removing stale gateway socket {}", self.socket.display());
            let _ = std::fs::remove_file(&self.socket);
        }
        if let Some(parent) = self.socket.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GatewayError::SocketPath {
                path: self.socket.clone(),
                source,
            })?;
        }
        let uds = UnixListener::bind(&self.socket).map_err(|source| GatewayError::SocketPath {
            path: self.socket.clone(),
            source,
        })?;

        let rest_server = rest_gateway::bind_server(
            self.rest_port,
            self.cluster.clone(),
            self.shutdown_tx.subscribe(),
        )?;

        let (mut health_reporter, health_service) = health_reporter();
        health_reporter
            .set_serving::<ClusterServiceServer<SdkService>>()
            .await;
        health_reporter
            .set_serving::<VolumeServiceServer<SdkService>>()
            .await;

        let build_router = |health| {
            let cluster_service = ClusterServiceServer::new(self.service.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .send_compressed(CompressionEncoding::Gzip);
            let volume_service = VolumeServiceServer::new(self.service.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .send_compressed(CompressionEncoding::Gzip);
            tonic::transport::Server::builder()
                .tcp_nodelay(true)
                .add_service(health)
                .add_service(InterceptedService::new(
                    cluster_service,
                    self.interceptor.clone(),
                ))
                .add_service(InterceptedService::new(
                    volume_service,
                    self.interceptor.clone(),
                ))
        };

        let tcp_router = build_router(health_service.clone());
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = tcp_router
                .serve_with_incoming_shutdown(
                    TcpListenerStream::new(tcp),
                    shutdown_rx.changed().map(move |_| {
                        warn!("Stopping management gateway on {}", bound_addr);
                    }),
                )
                .await
            {
                error!("management gateway (tcp) stopped serving: {:?}", e);
            }
        });

        let uds_router = build_router(health_service);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let socket = self.socket.clone();
        tokio::spawn(async move {
            if let Err(e) = uds_router
                .serve_with_incoming_shutdown(
                    UnixListenerStream::new(uds),
                    shutdown_rx.changed().map(move |_| {
                        warn!("Stopping management gateway on {}", socket.display());
                    }),
                )
                .await
            {
                error!("management gateway (uds) stopped serving: {:?}", e);
            }
        });

        tokio::spawn(rest_server);

        info!(
            "management gateway started: tcp={} uds={} rest_port={}",
            bound_addr,
            self.socket.display(),
            self.rest_port
        );
        Ok(())
    }

    /// The bound TCP address.
    pub fn address(&self) -> Result<SocketAddr> {
        self.bound_addr.ok_or_else(|| GatewayError::NotStarted.into())
    }

    pub fn socket(&self) -> &PathBuf {
        &self.socket
    }

    /// Signals every serving loop to drain and removes the socket file.
    /// Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let _ = std::fs::remove_file(&self.socket);
    }
}
