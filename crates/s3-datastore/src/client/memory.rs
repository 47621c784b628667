//! Process local object store, used by tests and for running without S3.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sha3::{Digest, Sha3_256};
use tokio::sync::RwLock;
use url::form_urlencoded;
use uuid::Uuid;

use crate::client::{PutObjectRequest, StorageError, StoreClient, StoredObject};
use crate::config::{Acl, StorageClass};
use crate::url_builder::encode_key;

const DEFAULT_ENDPOINT: &str = "memory.localhost";

/// Attributes kept next to each object so callers can check how it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub content_type: String,
    pub acl: Acl,
    pub storage_class: StorageClass,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
}

#[derive(Debug)]
struct MemoryObject {
    object: StoredObject,
    attributes: ObjectAttributes,
}

#[derive(Debug, Default)]
struct MemoryBucket {
    location: Option<String>,
    acl: Option<Acl>,
    objects: HashMap<String, MemoryObject>,
}

/// In-memory [`StoreClient`] with S3 like semantics: writes to a missing bucket fail,
/// reads of a missing key report [`StorageError::NotFound`].
///
/// Unlike S3, deleting a missing key is also reported as `NotFound`.
#[derive(Debug)]
pub struct InMemoryStoreClient {
    buckets: RwLock<HashMap<String, MemoryBucket>>,
    endpoint: String,
    signing_key: String,
}

impl Default for InMemoryStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStoreClient {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            signing_key: Uuid::new_v4().to_string(),
        }
    }

    /// Starts with the given bucket already present.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.buckets.get_mut().entry(bucket.into()).or_default();
        self
    }

    pub async fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.read().await.contains_key(bucket)
    }

    /// Acl the bucket was created with.
    pub async fn bucket_acl(&self, bucket: &str) -> Option<Acl> {
        self.buckets.read().await.get(bucket).and_then(|b| b.acl)
    }

    pub async fn object_attributes(&self, bucket: &str, key: &str) -> Option<ObjectAttributes> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|b| b.objects.get(key)).map(|o| o.attributes.clone())
    }

    /// Keys of a bucket in lexicographic order.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.read().await;
        let mut keys: Vec<String> = buckets.get(bucket).map(|b| b.objects.keys().cloned().collect()).unwrap_or_default();
        keys.sort();
        keys
    }

    fn signature(&self, bucket: &str, key: &str, expires_at: i64, query: &BTreeMap<String, String>) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(self.signing_key.as_bytes());
        hasher.update(bucket.as_bytes());
        hasher.update(key.as_bytes());
        hasher.update(expires_at.to_be_bytes());
        for (name, value) in query {
            hasher.update(name.as_bytes());
            hasher.update(value.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl StoreClient for InMemoryStoreClient {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), StorageError> {
        let data = request.body.into_bytes().await?;
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.get_mut(&request.bucket).ok_or_else(|| StorageError::NoSuchBucket(request.bucket.clone()))?;

        let attributes = ObjectAttributes {
            content_type: request.content_type.clone(),
            acl: request.acl,
            storage_class: request.storage_class,
            cache_control: request.cache_control,
            content_disposition: request.content_disposition,
            content_encoding: request.content_encoding,
        };
        let object = StoredObject { data, metadata: request.metadata, content_type: Some(request.content_type) };
        bucket.objects.insert(request.key, MemoryObject { object, attributes });
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        let buckets = self.buckets.read().await;
        let objects = &buckets.get(bucket).ok_or_else(|| StorageError::NoSuchBucket(bucket.to_string()))?.objects;
        objects
            .get(key)
            .map(|o| o.object.clone())
            .ok_or_else(|| StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        let objects = &mut buckets.get_mut(bucket).ok_or_else(|| StorageError::NoSuchBucket(bucket.to_string()))?.objects;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() })
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).map(|b| b.location.clone()).ok_or_else(|| StorageError::NoSuchBucket(bucket.to_string()))
    }

    async fn create_bucket(
        &self,
        bucket: &str,
        location: Option<String>,
        acl: Option<Acl>,
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_insert_with(|| MemoryBucket { location, acl, objects: HashMap::new() });
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        query: &BTreeMap<String, String>,
    ) -> Result<String, StorageError> {
        let expires_in = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::PresigningConfigError(e.to_string()))?;
        let expires_at = (Utc::now() + expires_in).timestamp();

        let query_string = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .append_pair("X-Expires", &expires_at.to_string())
            .append_pair("X-Signature", &self.signature(bucket, key, expires_at, query))
            .finish();
        Ok(format!("https://{}/{}/{}?{}", self.endpoint, encode_key(bucket), encode_key(key), query_string))
    }
}
