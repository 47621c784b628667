use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use mockall::Sequence;
use rstest::rstest;
use tracing_test::traced_test;

use crate::client::{MockStoreClient, ObjectBody, StorageError, StoredObject};
use crate::config::{Acl, DataStoreConfig, StorageClass};
use crate::tests::common::{build_store, client_with_bucket, config, TEST_BUCKET};
use crate::url_builder::{Expiry, UrlOptions};
use crate::{Content, DataStore, DataStoreError, WriteOptions, DATASTORE_NAME};

#[rstest]
#[tokio::test]
async fn bucket_is_probed_and_created_once(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client
        .expect_get_bucket_location()
        .withf(|bucket| bucket == TEST_BUCKET)
        .times(1)
        .returning(|bucket| Err(StorageError::NoSuchBucket(bucket.to_string())));
    client
        .expect_create_bucket()
        .withf(|bucket, location, acl| {
            bucket == TEST_BUCKET && location.as_deref() == Some("eu-west-1") && acl.is_none()
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    client.expect_put_object().times(3).returning(|_| Ok(()));

    let store = build_store(config, client);
    for _ in 0..3 {
        store.write(Content::from_bytes("data"), WriteOptions::default()).await.unwrap();
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_writes_probe_and_create_once(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client
        .expect_get_bucket_location()
        .times(1)
        .returning(|bucket| Err(StorageError::NoSuchBucket(bucket.to_string())));
    client.expect_create_bucket().times(1).returning(|_, _, _| Ok(()));
    client.expect_put_object().times(4).returning(|_| Ok(()));

    let store = Arc::new(build_store(config, client));
    let write = |name: &'static str| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store.write(Content::from_bytes("data").with_name(name), WriteOptions::default()).await
        })
    };

    let (a, b, c, d) = tokio::join!(write("a.txt"), write("b.txt"), write("c.txt"), write("d.txt"));
    for result in [a, b, c, d] {
        result.expect("write task panicked").unwrap();
    }
}

#[rstest]
#[tokio::test]
async fn existing_bucket_is_not_created(config: DataStoreConfig) {
    let mut client = client_with_bucket();
    client.expect_create_bucket().never();
    client.expect_put_object().times(1).returning(|_| Ok(()));

    let store = build_store(config, client);
    store.write(Content::from_bytes("data"), WriteOptions::default()).await.unwrap();
}

#[rstest]
#[tokio::test]
async fn ensure_ready_without_writes_creates_the_bucket_with_its_acl(config: DataStoreConfig) {
    let config = DataStoreConfig { bucket_acl: Some(Acl::PublicRead), ..config };
    let mut client = MockStoreClient::new();
    client.expect_get_bucket_location().times(1).returning(|bucket| Err(StorageError::NoSuchBucket(bucket.to_string())));
    client
        .expect_create_bucket()
        .withf(|_, _, acl| *acl == Some(Acl::PublicRead))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let store = build_store(config, client);
    store.ensure_ready().await.unwrap();
    store.ensure_ready().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn failed_bucket_creation_is_retried_on_next_write(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    let mut seq = Sequence::new();
    client
        .expect_get_bucket_location()
        .times(2)
        .returning(|bucket| Err(StorageError::NoSuchBucket(bucket.to_string())));
    client
        .expect_create_bucket()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(StorageError::ObjectStreamError("connection reset".to_string())));
    client.expect_create_bucket().times(1).in_sequence(&mut seq).returning(|_, _, _| Ok(()));
    client.expect_put_object().times(1).returning(|_| Ok(()));

    let store = build_store(config, client);

    let first = store.write(Content::from_bytes("data"), WriteOptions::default()).await;
    assert_matches!(first, Err(DataStoreError::StorageError(StorageError::ObjectStreamError(_))));

    store.write(Content::from_bytes("data"), WriteOptions::default()).await.unwrap();
}

#[rstest]
#[tokio::test]
async fn write_uses_config_defaults_and_returns_generated_uid(config: DataStoreConfig) {
    let config = DataStoreConfig { root_path: Some("uploads/".to_string()), ..config };
    let mut client = client_with_bucket();
    client
        .expect_put_object()
        .withf(|request| {
            request.bucket == TEST_BUCKET
                && request.key.starts_with("uploads/")
                && request.key.ends_with("/photo.jpg")
                && request.content_type == "image/jpeg"
                && request.acl == Acl::Private
                && request.storage_class == StorageClass::Standard
                && request.body == ObjectBody::Bytes(Bytes::from_static(b"jpeg bytes"))
                && request.metadata.get("owner").map(String::as_str) == Some("alice")
        })
        .times(1)
        .returning(|_| Ok(()));

    let store = build_store(config, client);
    let content = Content::from_bytes(&b"jpeg bytes"[..]).with_name("photo.jpg").with_meta("owner", "alice");
    let uid = store.write(content, WriteOptions::default()).await.unwrap();

    // <y>/<m>/<d>/<H>/<M>/<S>/<uuid>/<name>
    assert_eq!(uid.split('/').count(), 8);
    assert!(uid.ends_with("/photo.jpg"));
    assert_eq!(store.full_path(&uid), format!("uploads/{uid}"));
}

#[rstest]
#[tokio::test]
async fn write_without_name_falls_back_to_file(config: DataStoreConfig) {
    let mut client = client_with_bucket();
    client
        .expect_put_object()
        .withf(|request| request.key.ends_with("/file") && request.content_type == "application/octet-stream")
        .times(1)
        .returning(|_| Ok(()));

    let store = build_store(config, client);
    let uid = store.write(Content::from_bytes("data"), WriteOptions::default()).await.unwrap();
    assert!(uid.ends_with("/file"));
}

#[rstest]
#[tokio::test]
async fn write_options_override_defaults(config: DataStoreConfig) {
    let config = DataStoreConfig { acl: Acl::PublicRead, storage_class: StorageClass::StandardIa, ..config };
    let mut client = client_with_bucket();
    client
        .expect_put_object()
        .withf(|request| {
            request.key == "avatars/42.png"
                && request.content_type == "image/webp"
                && request.acl == Acl::AuthenticatedRead
                && request.storage_class == StorageClass::ReducedRedundancy
                && request.cache_control.as_deref() == Some("max-age=3600")
                && request.content_disposition.as_deref() == Some("inline")
                && request.content_encoding.as_deref() == Some("gzip")
                && request.metadata.get("owner").map(String::as_str) == Some("bob")
        })
        .times(1)
        .returning(|_| Ok(()));

    let store = build_store(config, client);
    let options = WriteOptions::default()
        .path("avatars/42.png")
        .content_type("image/webp")
        .acl(Acl::AuthenticatedRead)
        .storage_class(StorageClass::ReducedRedundancy)
        .cache_control("max-age=3600")
        .content_disposition("inline")
        .content_encoding("gzip")
        .meta("owner", "bob");
    let content = Content::from_bytes("data").with_name("42.png").with_meta("owner", "alice");

    let uid = store.write(content, options).await.unwrap();
    assert_eq!(uid, "avatars/42.png");
}

#[rstest]
#[tokio::test]
async fn put_failure_is_returned(config: DataStoreConfig) {
    let mut client = client_with_bucket();
    client
        .expect_put_object()
        .times(1)
        .returning(|request| Err(StorageError::NoSuchBucket(request.bucket)));

    let store = build_store(config, client);
    let result = store.write(Content::from_bytes("data"), WriteOptions::default()).await;
    assert_matches!(result, Err(DataStoreError::StorageError(StorageError::NoSuchBucket(_))));
}

#[rstest]
#[tokio::test]
async fn read_returns_stored_object(config: DataStoreConfig) {
    let config = DataStoreConfig { root_path: Some("root".to_string()), ..config };
    let mut client = MockStoreClient::new();
    client.expect_get_bucket_location().never();
    client
        .expect_get_object()
        .withf(|bucket, key| bucket == TEST_BUCKET && key == "root/some/uid")
        .times(1)
        .returning(|_, _| {
            Ok(StoredObject {
                data: Bytes::from_static(b"hello"),
                metadata: [("owner".to_string(), "alice".to_string())].into(),
                content_type: Some("text/plain".to_string()),
            })
        });

    let store = build_store(config, client);
    let object = store.read("some/uid").await.unwrap().expect("object is stored");

    assert_eq!(object.data, Bytes::from_static(b"hello"));
    assert_eq!(object.metadata.get("owner").map(String::as_str), Some("alice"));
    assert_eq!(object.content_type.as_deref(), Some("text/plain"));
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn read_of_missing_object_is_none(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client
        .expect_get_object()
        .returning(|bucket, key| Err(StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() }));

    let store = build_store(config, client);
    assert_eq!(store.read("missing").await.unwrap(), None);
    assert!(logs_contain("data_storage_read"));
}

#[rstest]
#[tokio::test]
async fn read_failure_other_than_not_found_is_returned(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client.expect_get_object().returning(|_, _| Err(StorageError::ObjectStreamError("timeout".to_string())));

    let store = build_store(config, client);
    assert_matches!(
        store.read("uid").await,
        Err(DataStoreError::StorageError(StorageError::ObjectStreamError(_)))
    );
}

#[rstest]
#[tokio::test]
async fn destroy_deletes_resolved_key(config: DataStoreConfig) {
    let config = DataStoreConfig { root_path: Some("root".to_string()), ..config };
    let mut client = MockStoreClient::new();
    client
        .expect_delete_object()
        .withf(|bucket, key| bucket == TEST_BUCKET && key == "root/uid")
        .times(1)
        .returning(|_, _| Ok(()));

    build_store(config, client).destroy("uid").await;
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn destroy_failure_is_logged_not_returned(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client
        .expect_delete_object()
        .times(1)
        .returning(|bucket, key| Err(StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() }));

    build_store(config, client).destroy("uid").await;

    assert!(logs_contain("S3DataStore destroy error"));
    assert!(logs_contain("DataStorage"));
    assert!(logs_contain("data_storage_destroy"));
}

#[rstest]
#[case::virtual_hosted("my-bucket", "http://my-bucket.s3.amazonaws.com/some/uid.txt")]
#[case::path_style("My_Bucket", "http://s3.amazonaws.com/My_Bucket/some/uid.txt")]
#[tokio::test]
async fn public_url_addressing(#[case] bucket: &str, #[case] expected: &str) {
    let store = build_store(DataStoreConfig::new(bucket), MockStoreClient::new());
    assert_eq!(store.url_for("some/uid.txt", &UrlOptions::default()).await.unwrap(), expected);
}

#[rstest]
#[case::dot_segments("a/../b/./c", "http://my-bucket.s3.amazonaws.com/a/%2E%2E/b/%2E/c")]
#[case::leading_separator("/lead", "http://my-bucket.s3.amazonaws.com//lead")]
#[tokio::test]
async fn public_url_path_is_the_stored_key(#[case] uid: &str, #[case] expected: &str) {
    let store = build_store(DataStoreConfig::new(TEST_BUCKET), MockStoreClient::new());
    assert_eq!(store.url_for(uid, &UrlOptions::default()).await.unwrap(), expected);
}

#[rstest]
#[tokio::test]
async fn public_url_honours_overrides(config: DataStoreConfig) {
    let config = DataStoreConfig {
        url_scheme: "https".to_string(),
        url_host: Some("cdn.example.com".to_string()),
        root_path: Some("assets".to_string()),
        ..config
    };
    let store = build_store(config, MockStoreClient::new());

    let url = store.url_for("a b.png", &UrlOptions::default()).await.unwrap();
    assert_eq!(url, "https://cdn.example.com/assets/a%20b.png");

    let options = UrlOptions::default().scheme("http").host("static.example.com");
    let url = store.url_for("a b.png", &options).await.unwrap();
    assert_eq!(url, "http://static.example.com/assets/a%20b.png");
}

#[rstest]
#[tokio::test]
async fn url_with_expiry_is_signed_by_the_client(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client
        .expect_signed_url()
        .withf(|bucket, key, expires_in, query| {
            bucket == TEST_BUCKET
                && key == "some/uid"
                && *expires_in == Duration::from_secs(300)
                && query.get("response-content-disposition").map(String::as_str) == Some("attachment")
        })
        .times(1)
        .returning(|_, _, _, _| Ok("https://my-bucket.s3.eu-west-1.amazonaws.com/some/uid?X-Amz-Signature=abc".to_string()));

    let store = build_store(config, client);
    let options = UrlOptions::default()
        .expires(Duration::from_secs(300))
        .query("response-content-disposition", "attachment");

    let signed = store.url_for("some/uid", &options).await.unwrap();
    let plain = store.url_for("some/uid", &UrlOptions::default()).await.unwrap();

    assert!(signed.contains("X-Amz-Signature="));
    assert_ne!(signed, plain);
}

#[rstest]
#[tokio::test]
async fn url_with_past_expiry_is_rejected(config: DataStoreConfig) {
    let mut client = MockStoreClient::new();
    client.expect_signed_url().never();

    let store = build_store(config, client);
    let options = UrlOptions::default().expires(Expiry::At(Utc::now() - TimeDelta::minutes(1)));

    assert_matches!(store.url_for("uid", &options).await, Err(DataStoreError::InvalidExpiry(_)));
}

#[rstest]
#[tokio::test]
async fn trait_object_dispatches_to_store(config: DataStoreConfig) {
    let mut client = client_with_bucket();
    client.expect_put_object().times(1).returning(|_| Ok(()));
    client.expect_delete_object().times(1).returning(|_, _| Ok(()));

    let store: Box<dyn DataStore> = Box::new(build_store(config, client));
    assert_eq!(store.name(), DATASTORE_NAME);

    let uid = store.write(Content::from_bytes("data"), WriteOptions::default()).await.unwrap();
    store.destroy(&uid).await;
}

#[test]
fn invalid_config_is_rejected_before_any_call() {
    let result = crate::S3DataStore::new(DataStoreConfig::new(""), Arc::new(MockStoreClient::new()));
    assert_matches!(result, Err(DataStoreError::ConfigError(_)));
}

#[tokio::test]
async fn connect_rejects_invalid_config_before_loading_aws_config() {
    let config = DataStoreConfig { url_scheme: "ht tp".to_string(), ..DataStoreConfig::new(TEST_BUCKET) };
    let result = crate::S3DataStore::connect(config).await;
    assert_matches!(result, Err(DataStoreError::ConfigError(_)));
}
