//! The two gateway servers and their shared transport plumbing.
//!
//! Both gateways follow the same lifecycle: `start` binds every listener and
//! returns once bound, request serving runs on background tasks for the
//! server's lifetime, and `stop` signals a watch channel for graceful,
//! idempotent shutdown.

mod csi_server;
mod csi_service;
mod rest_gateway;
mod sdk_server;
mod sdk_service;

pub use csi_server::*;
pub use sdk_server::*;


//-------------------------------------------------------------------------------

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::UnixStream;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tonic::transport::Uri;
use tower::service_fn;

use crate::GatewayError;
use crate::Result;

/// Shared sink for access/audit log lines. The harness passes a discard
/// sink; production callers hand in real writers.
pub type LogSink = Arc<Mutex<Box<dyn std::io::Write + Send>>>;

pub fn discard_sink() -> LogSink {
    Arc::new(Mutex::new(Box::new(std::io::sink())))
}

/// How long the protocol gateway waits for its one dial of the management
/// gateway socket. Not retried by callers.
pub(crate) const SDK_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn ensure_tcp(net: &str) -> Result<()> {
    if net != "tcp" {
        return Err(GatewayError::UnsupportedNet(net.to_string()).into());
    }
    Ok(())
}

/// Accepts both `host:port` and the bare `:port` shorthand.
pub(crate) fn normalize_address(address: &str) -> String {
    if let Some(port) = address.strip_prefix(':') {
        format!("127.0.0.1:{}", port)
    } else {
        address.to_string()
    }
}

/// Dial a gRPC channel over a unix-domain socket. The endpoint URI is a
/// placeholder; the connector ignores it and connects to `path`.
pub(crate) async fn connect_uds(
    path: &Path,
    connect_timeout: Duration,
) -> std::result::Result<Channel, tonic::transport::Error> {
    let path = path.to_path_buf();
    Endpoint::try_from("http://[::]:50051")?
        .connect_timeout(connect_timeout)
        .connect_with_connector(service_fn(move |_: Uri| {
            let path = path.clone();
            async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
        }))
        .await
}
