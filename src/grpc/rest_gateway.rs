//! REST surface of the management gateway: cluster status and metrics.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::error;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::metrics;
use crate::Cluster;
use crate::GatewayError;
use crate::Result;

/// Binds the REST listener and hands back the serving future. Binding
/// happens here so the caller learns about a taken port before it
/// reports itself started.
pub(crate) fn bind_server(
    port: u16,
    cluster: Arc<dyn Cluster>,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<impl Future<Output = ()>> {
    let cluster_route = warp::path!("v1" / "cluster").and_then(move || {
        let cluster = cluster.clone();
        async move { cluster_handler(cluster).await }
    });
    let metrics_route = warp::path!("metrics").map(metrics::metrics_body);

    let (_, server) = warp::serve(metrics_route.or(cluster_route))
        .try_bind_with_graceful_shutdown(([127, 0, 0, 1], port), async move {
            let _ = shutdown_signal.changed().await;
        })
        .map_err(|source| GatewayError::RestBind {
            port,
            source: Box::new(source),
        })?;
    Ok(server)
}

async fn cluster_handler(
    cluster: Arc<dyn Cluster>,
) -> std::result::Result<impl Reply, Rejection> {
    match cluster.enumerate().await {
        Ok(info) => Ok(warp::reply::json(&info)),
        Err(e) => {
            error!("cluster enumerate failed on REST route: {}", e);
            Err(warp::reject::reject())
        }
    }
}
