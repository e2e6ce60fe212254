use std::sync::Once;

use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref VOLUME_OPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("volume_ops_total", "Volume operations served by the driver"),
        &["op"]
    )
    .expect("metric can not be created");

    pub static ref READINESS_POLLS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("readiness_polls_total", "Cluster readiness poll outcomes"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER_ONCE: Once = Once::new();

fn register_custom_metrics() {
    REGISTER_ONCE.call_once(|| {
        prometheus_exporter::init();
        REGISTRY
            .register(Box::new(VOLUME_OPS_TOTAL.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(READINESS_POLLS_TOTAL.clone()))
            .expect("collector can be registered");
    });
}

/// Prometheus text exposition for the REST gateway's `/metrics` route:
/// custom collectors followed by the autometrics-generated series.
pub fn metrics_body() -> String {
    use prometheus::Encoder;

    register_custom_metrics();
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        eprintln!("could not encode custom metrics: {}", e);
    }
    let mut body = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };

    body.push_str(&prometheus_exporter::encode_http_response().into_body());
    body
}
