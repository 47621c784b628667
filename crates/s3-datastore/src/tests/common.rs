use std::sync::Arc;

use rstest::fixture;

use crate::client::MockStoreClient;
use crate::config::DataStoreConfig;
use crate::S3DataStore;

pub const TEST_BUCKET: &str = "my-bucket";

#[fixture]
pub fn config() -> DataStoreConfig {
    DataStoreConfig { region: Some("eu-west-1".to_string()), ..DataStoreConfig::new(TEST_BUCKET) }
}

/// Mock client whose bucket probe always succeeds.
pub fn client_with_bucket() -> MockStoreClient {
    let mut client = MockStoreClient::new();
    client.expect_get_bucket_location().returning(|_| Ok(Some("eu-west-1".to_string())));
    client
}

pub fn build_store(config: DataStoreConfig, client: MockStoreClient) -> S3DataStore {
    S3DataStore::new(config, Arc::new(client)).expect("valid config")
}
