use tempfile::tempdir;

use super::*;
use crate::proto::v1::identity_service_client::IdentityServiceClient;
use crate::proto::v1::volume_service_client::VolumeServiceClient;
use crate::proto::v1::ClusterInfo;
use crate::proto::v1::ProbeRequest;
use crate::proto::v1::Status;
use crate::proto::v1::VolumeCreateRequest;
use crate::proto::v1::VolumeDeleteRequest;
use crate::proto::v1::VolumeLocator;
use crate::proto::v1::VolumeSpec;
use crate::test_utils::enable_logger;
use crate::test_utils::TestServer;
use crate::Error;

#[test]
fn test_default_target_dir_provisioning() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("mnt/csi");

    let callback = default_target_dir();
    let target = callback(&root).unwrap();

    assert_eq!(target, root.join("target"));
    assert!(target.is_dir());
    let mode = fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);

    // Re-provisioning an existing tree succeeds
    let again = callback(&root).unwrap();
    assert_eq!(again, target);
}

#[tokio::test]
async fn test_run_against_fake_stack() {
    enable_logger();
    let mut ts = TestServer::start_fake().await;
    let tmp = tempdir().unwrap();

    let config = Config {
        address: ts.server_address(),
        target_path: tmp.path().join("mnt/csi"),
        create_target_dir: default_target_dir(),
    };
    run(&config).await.unwrap();

    ts.stop().await;
}

#[tokio::test]
async fn test_run_fails_when_no_gateway_listens() {
    let tmp = tempdir().unwrap();
    let config = Config {
        address: "127.0.0.1:1".to_string(),
        target_path: tmp.path().join("mnt/csi"),
        create_target_dir: default_target_dir(),
    };

    match run(&config).await {
        Err(Error::Sanity(SanityError::Connect { address, .. })) => {
            assert_eq!(address, "127.0.0.1:1");
        }
        other => panic!("expected connect failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_fails_when_target_not_provisioned() {
    let tmp = tempdir().unwrap();
    let config = Config {
        address: "127.0.0.1:1".to_string(),
        target_path: tmp.path().join("mnt/csi"),
        // Returns a path it never creates; run must fail before dialing
        create_target_dir: Box::new(|p| Ok(p.join("missing"))),
    };

    match run(&config).await {
        Err(Error::Sanity(SanityError::TargetMissing(path))) => {
            assert!(path.ends_with("missing"));
        }
        other => panic!("expected missing target, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mock_driver_expectations_verified_on_stop() {
    enable_logger();
    let mut ts = TestServer::builder()
        .with_mock_driver(|mock| {
            mock.expect_create()
                .withf(|locator, spec| locator.name == "sanity-vol" && spec.size == 1 << 20)
                .times(1)
                .returning(|_, _| Ok("mock-vol-1".to_string()));
            mock.expect_delete()
                .withf(|id| id == "mock-vol-1")
                .times(1)
                .returning(|_| Ok(()));
        })
        .start()
        .await;

    let mut volumes = VolumeServiceClient::connect(format!("http://127.0.0.1:{}", ts.port()))
        .await
        .unwrap();

    let created = volumes
        .create(VolumeCreateRequest {
            locator: Some(VolumeLocator {
                name: "sanity-vol".to_string(),
            }),
            spec: Some(VolumeSpec {
                size: 1 << 20,
                shared: false,
                ha_level: 1,
            }),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(created.volume_id, "mock-vol-1");

    volumes
        .delete(VolumeDeleteRequest {
            volume_id: "mock-vol-1".to_string(),
        })
        .await
        .unwrap();

    // Drops the mock handle; unmet expectations would panic here
    ts.stop().await;
}

#[tokio::test]
async fn test_mock_cluster_expectations_verified_on_stop() {
    enable_logger();
    let mut ts = TestServer::builder()
        .with_mock_cluster(|mock| {
            mock.expect_start().times(1).returning(|| Ok(()));
            mock.expect_enumerate().times(1..).returning(|| {
                Ok(ClusterInfo {
                    id: "mockcluster".to_string(),
                    node_id: "mockNode".to_string(),
                    status: Status::Ok.into(),
                    nodes: vec![],
                })
            });
        })
        .start()
        .await;

    let mut identity = IdentityServiceClient::new(ts.conn());
    let probe = identity.probe(ProbeRequest {}).await.unwrap().into_inner();
    assert!(probe.ready);

    // Both gateways hold cluster handles; stop drains them before the
    // drop-time verification runs
    ts.stop().await;
}
