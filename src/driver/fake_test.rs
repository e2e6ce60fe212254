use std::collections::HashMap;
use std::sync::Arc;

use crate::proto::v1::Status;
use crate::proto::v1::VolumeLocator;
use crate::proto::v1::VolumeSpec;
use crate::DriverError;
use crate::Error;
use crate::FakeDriver;
use crate::KvStore;
use crate::VolumeDriver;

fn new_driver() -> FakeDriver {
    let kv = Arc::new(KvStore::open_temporary("fake_test").unwrap());
    FakeDriver::new(kv, &HashMap::new())
}

fn locator(name: &str) -> VolumeLocator {
    VolumeLocator {
        name: name.to_string(),
    }
}

fn spec(size: u64) -> VolumeSpec {
    VolumeSpec {
        size,
        shared: false,
        ha_level: 1,
    }
}

#[tokio::test]
async fn test_create_inspect_delete() {
    let driver = new_driver();
    assert_eq!(driver.name(), "fake");
    assert_eq!(driver.status(), Status::Ok);

    let id = driver.create(locator("vol1"), spec(1 << 20)).await.unwrap();
    assert!(!id.is_empty());

    let volumes = driver.inspect(vec![id.clone()]).await.unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].id, id);
    assert_eq!(volumes[0].locator.as_ref().unwrap().name, "vol1");
    assert_eq!(volumes[0].spec.as_ref().unwrap().size, 1 << 20);

    driver.delete(id.clone()).await.unwrap();
    let err = driver.inspect(vec![id]).await.unwrap_err();
    assert!(matches!(err, Error::Driver(DriverError::VolumeNotFound(_))));
}

#[tokio::test]
async fn test_create_duplicate_name_fails() {
    let driver = new_driver();
    driver.create(locator("vol1"), spec(1)).await.unwrap();

    let err = driver.create(locator("vol1"), spec(2)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Driver(DriverError::VolumeExists(name)) if name == "vol1"
    ));
}

#[tokio::test]
async fn test_inspect_empty_ids_enumerates_all() {
    let driver = new_driver();
    driver.create(locator("a"), spec(1)).await.unwrap();
    driver.create(locator("b"), spec(2)).await.unwrap();

    let volumes = driver.inspect(vec![]).await.unwrap();
    assert_eq!(volumes.len(), 2);
}

#[tokio::test]
async fn test_delete_missing_volume_fails() {
    let driver = new_driver();
    let err = driver.delete("no-such-id".to_string()).await.unwrap_err();
    assert!(matches!(err, Error::Driver(DriverError::VolumeNotFound(_))));
}
