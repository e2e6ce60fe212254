//! Bounded readiness gate polled against the cluster.
//!
//! The state machine is POLLING -> READY when a status enumeration reports
//! OK within the deadline, POLLING -> TIMED_OUT when the deadline elapses
//! first. An enumeration failure is a hard error and is not retried: once
//! the cluster manager is started the status call is assumed always
//! available, so a failure indicates a setup bug rather than transient
//! unavailability.
//!
//! The deadline is checked only between poll attempts; an in-flight
//! enumeration always runs to completion before expiry is considered.


use tokio::time::sleep;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;

use crate::metrics::READINESS_POLLS_TOTAL;
use crate::proto::v1::Status;
use crate::Cluster;
use crate::ReadinessConfig;
use crate::ReadinessError;

pub async fn await_cluster_ready(
    cluster: &dyn Cluster,
    config: &ReadinessConfig,
) -> std::result::Result<(), ReadinessError> {
    let started = Instant::now();
    let deadline = started + config.deadline();

    loop {
        if Instant::now() >= deadline {
            READINESS_POLLS_TOTAL.with_label_values(&["timeout"]).inc();
            error!("cluster did not become ready within {:?}", config.deadline());
            return Err(ReadinessError::Timeout {
                waited: started.elapsed(),
            });
        }

        let info = cluster.enumerate().await.map_err(|e| {
            READINESS_POLLS_TOTAL.with_label_values(&["error"]).inc();
            error!("cluster status enumeration failed: {}", e);
            ReadinessError::Enumerate(Box::new(e))
        })?;

        if info.status() == Status::Ok {
            READINESS_POLLS_TOTAL.with_label_values(&["ready"]).inc();
            debug!("cluster {} is ready after {:?}", info.id, started.elapsed());
            return Ok(());
        }

        sleep(config.poll_interval()).await;
    }
}
