mod auth;
mod cluster;
mod config;
mod constants;
mod driver;
mod errors;
mod grpc;
mod kv;
mod metrics;
mod policy;
mod readiness;
mod runtime;
pub mod proto;
pub mod sanity;

pub use auth::*;
pub use cluster::*;
pub use config::*;
pub use constants::*;
pub use driver::*;
pub use errors::*;
pub use grpc::*;
pub use kv::*;
pub use metrics::*;
pub use policy::*;
pub use readiness::*;
pub use runtime::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
