pub mod error;
pub mod memory;
pub mod s3;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
pub use error::StorageError;
pub use memory::InMemoryStoreClient;
pub use s3::AwsS3Client;

use crate::config::{Acl, StorageClass};

/// Payload handed to the store on a put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBody {
    Bytes(Bytes),
    /// Streamed from disk by the client, never buffered by the adapter.
    File(PathBuf),
}

impl ObjectBody {
    /// Collects the body into memory.
    pub async fn into_bytes(self) -> Result<Bytes, StorageError> {
        match self {
            ObjectBody::Bytes(bytes) => Ok(bytes),
            ObjectBody::File(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }
}

/// Everything needed to store a single object.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: ObjectBody,
    pub content_type: String,
    /// User-defined metadata
    pub metadata: HashMap<String, String>,
    pub acl: Acl,
    pub storage_class: StorageClass,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
}

/// An object as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    /// User-defined metadata
    pub metadata: HashMap<String, String>,
    pub content_type: Option<String>,
}

/// Trait defining the object store operations the data store relies on.
///
/// Implementations report a missing object from `get_object` as [`StorageError::NotFound`];
/// every other failure is passed through as-is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Store an object, overwriting anything already at the key.
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), StorageError>;

    /// Fetch an object with its metadata.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError>;

    /// Delete an object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Existence probe for a bucket. Returns the location constraint if the store reports one.
    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>, StorageError>;

    /// Create a bucket in the given location.
    async fn create_bucket(&self, bucket: &str, location: Option<String>, acl: Option<Acl>)
        -> Result<(), StorageError>;

    /// Build a time limited https url for reading an object.
    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        query: &BTreeMap<String, String>,
    ) -> Result<String, StorageError>;
}
