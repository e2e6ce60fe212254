//! Shared harness components between unit tests and integration tests.
//!
//! [`TestServer`] assembles the full gateway stack the way a conformance run
//! uses it: a per-run [`Runtime`], a bootstrapped fake cluster, a management
//! gateway on a random TCP port plus a local socket, and a protocol gateway
//! dialing that socket. Interaction-based tests swap the driver or the
//! cluster seam for a mockall double through the builder.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tonic::transport::Channel;
use tracing::info;

use crate::await_cluster_ready;
use crate::constants::FAKE_DRIVER_NAME;
use crate::constants::MOCK_DRIVER_NAME;
use crate::discard_sink;
use crate::Cluster;
use crate::ClusterConfig;
use crate::ClusterManager;
use crate::CsiServer;
use crate::CsiServerConfig;
use crate::KvStore;
use crate::MockCluster;
use crate::MockVolumeDriver;
use crate::ReadinessConfig;
use crate::Runtime;
use crate::SdkServer;
use crate::SdkServerConfig;
use crate::StoragePolicyStore;
use crate::VolumeDriver;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Random ports the way the original harness picks them: a TCP port in
/// [10000, 30000), the REST port right above it, and a socket path keyed by
/// the port. Collisions across concurrent runs are accepted as rare.
pub fn set_ports() -> (u16, u16, PathBuf) {
    let port: u16 = rand::thread_rng().gen_range(10_000..30_000);
    let gwport = port + 1;
    let uds = PathBuf::from(format!("/tmp/volgate-csi-ut-{}.sock", port));
    (port, gwport, uds)
}

/// Bootstrap the fake stack on `runtime`: fresh temporary store, fake
/// cluster context, "fake" driver registered. Failures here make the whole
/// run unusable, so they abort it.
pub fn setup_fake_driver(runtime: &Runtime) -> Arc<ClusterManager> {
    let kv = KvStore::open_temporary("harness").expect("open temporary kv store");
    runtime.set_kv(kv);
    let cluster = runtime
        .init_cluster(ClusterConfig {
            cluster_id: "fakecluster".to_string(),
            node_id: "fakeNode".to_string(),
        })
        .expect("initialize fake cluster context");
    runtime
        .register_driver(FAKE_DRIVER_NAME, &HashMap::new())
        .expect("register fake driver");
    cluster
}

pub struct TestServerBuilder {
    driver_name: String,
    mock_driver: Option<MockVolumeDriver>,
    mock_cluster: Option<MockCluster>,
    readiness: ReadinessConfig,
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self {
            driver_name: FAKE_DRIVER_NAME.to_string(),
            mock_driver: None,
            mock_cluster: None,
            readiness: ReadinessConfig::default(),
        }
    }
}

impl TestServerBuilder {
    /// Serve the "mock" driver instead of the fake one. Expectations are set
    /// by `configure` before the mock is shared with the gateway.
    pub fn with_mock_driver(
        mut self,
        configure: impl FnOnce(&mut MockVolumeDriver),
    ) -> Self {
        let mut mock = MockVolumeDriver::new();
        mock.expect_name().return_const(MOCK_DRIVER_NAME.to_string());
        configure(&mut mock);
        self.driver_name = MOCK_DRIVER_NAME.to_string();
        self.mock_driver = Some(mock);
        self
    }

    /// Substitute the cluster seam with a mock. The harness spawns `start`
    /// and the readiness gate and probe proxy both poll `enumerate`, so
    /// `configure` must set expectations for both.
    pub fn with_mock_cluster(
        mut self,
        configure: impl FnOnce(&mut MockCluster),
    ) -> Self {
        let mut mock = MockCluster::new();
        configure(&mut mock);
        self.mock_cluster = Some(mock);
        self
    }

    pub fn with_readiness(
        mut self,
        readiness: ReadinessConfig,
    ) -> Self {
        self.readiness = readiness;
        self
    }

    pub async fn start(self) -> TestServer {
        enable_logger();

        let (port, gwport, uds) = set_ports();
        let runtime = Runtime::new(KvStore::open_temporary("harness-boot").expect("open kv store"));
        let fake_cluster = setup_fake_driver(&runtime);

        let mock_driver = self.mock_driver.map(Arc::new);
        if let Some(mock) = &mock_driver {
            let driver: Arc<dyn VolumeDriver> = mock.clone();
            runtime
                .drivers()
                .add(MOCK_DRIVER_NAME, driver)
                .expect("register mock driver");
        }

        let mock_cluster = self.mock_cluster.map(Arc::new);
        let cluster: Arc<dyn Cluster> = match &mock_cluster {
            Some(mock) => mock.clone(),
            None => fake_cluster,
        };

        // The cluster bootstraps in the background; the readiness gate below
        // is the join point.
        let starter = cluster.clone();
        tokio::spawn(async move {
            starter.start().await.expect("cluster bootstrap");
        });
        await_cluster_ready(cluster.as_ref(), &self.readiness)
            .await
            .expect("cluster readiness");

        let mut sdk = SdkServer::new(
            SdkServerConfig {
                driver_name: self.driver_name.clone(),
                net: "tcp".to_string(),
                address: format!("127.0.0.1:{}", port),
                rest_port: gwport,
                cluster: cluster.clone(),
                socket: uds.clone(),
                storage_policy: Arc::new(StoragePolicyStore::new(runtime.kv())),
                access_output: discard_sink(),
                audit_output: discard_sink(),
                security: None,
            },
            &runtime,
        )
        .expect("construct management gateway");
        sdk.start().await.expect("start management gateway");

        let mut csi = CsiServer::new(CsiServerConfig {
            driver_name: self.driver_name.clone(),
            net: "tcp".to_string(),
            address: "127.0.0.1:0".to_string(),
            cluster: cluster.clone(),
            sdk_socket: uds.clone(),
        })
        .expect("construct protocol gateway");
        csi.start().await.expect("start protocol gateway");

        let address = csi.address().expect("protocol gateway address");
        let conn = Channel::from_shared(format!("http://{}", address))
            .expect("endpoint uri")
            .connect_timeout(Duration::from_secs(5))
            .connect()
            .await
            .expect("dial protocol gateway");

        info!("test server up: csi={} sdk_port={} gwport={}", address, port, gwport);
        TestServer {
            runtime,
            sdk: Some(sdk),
            csi: Some(csi),
            conn: Some(conn),
            mock_driver,
            mock_cluster,
            port,
            gwport,
            uds,
        }
    }
}

pub struct TestServer {
    runtime: Arc<Runtime>,
    sdk: Option<SdkServer>,
    csi: Option<CsiServer>,
    conn: Option<Channel>,
    mock_driver: Option<Arc<MockVolumeDriver>>,
    mock_cluster: Option<Arc<MockCluster>>,
    port: u16,
    gwport: u16,
    uds: PathBuf,
}

impl TestServer {
    pub async fn start_fake() -> Self {
        TestServerBuilder::default().start().await
    }

    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Client channel to the protocol gateway.
    pub fn conn(&self) -> Channel {
        self.conn.clone().expect("test server already stopped")
    }

    /// Bound address of the protocol gateway, as `host:port`.
    pub fn server_address(&self) -> String {
        self.csi
            .as_ref()
            .expect("test server already stopped")
            .address()
            .expect("protocol gateway not started")
    }

    pub fn mock_driver(&self) -> &Arc<MockVolumeDriver> {
        self.mock_driver.as_ref().expect("no mock driver configured")
    }

    pub fn mock_cluster(&self) -> &Arc<MockCluster> {
        self.mock_cluster.as_ref().expect("no mock cluster configured")
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn gwport(&self) -> u16 {
        self.gwport
    }

    pub fn uds(&self) -> &PathBuf {
        &self.uds
    }

    /// Teardown in the required order: unregister the mock driver, drop the
    /// client channel, stop the protocol gateway, stop the management
    /// gateway, then verify mock expectations.
    ///
    /// Verification runs on this task: the gateway handles are dropped here
    /// and the drained serving tasks release their clones, so teardown can
    /// reclaim sole ownership of each mock and the final drop panics on any
    /// unmet expectation.
    pub async fn stop(&mut self) {
        self.runtime.drivers().remove(MOCK_DRIVER_NAME);
        self.conn.take();
        if let Some(csi) = self.csi.take() {
            csi.stop();
        }
        if let Some(sdk) = self.sdk.take() {
            sdk.stop();
        }
        if let Some(mock) = self.mock_driver.take() {
            drop(into_sole_owner(mock).await);
        }
        if let Some(mock) = self.mock_cluster.take() {
            drop(into_sole_owner(mock).await);
        }
    }
}

/// Waits for the draining serving tasks to release their clones of `arc`.
async fn into_sole_owner<T>(mut arc: Arc<T>) -> T {
    for _ in 0..500 {
        match Arc::try_unwrap(arc) {
            Ok(inner) => return inner,
            Err(shared) => {
                arc = shared;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
    panic!("mock still shared after gateway shutdown");
}
