use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::client::{AwsS3Client, PutObjectRequest, StoreClient, StoredObject};
use crate::config::DataStoreConfig;
use crate::content::Content;
use crate::datastore::{DataStore, WriteOptions};
use crate::error::{DataStoreError, DataStoreResult};
use crate::path::resolve;
use crate::uid::{generate_uid, DEFAULT_NAME};
use crate::url_builder::{bucket_host, public_url, UrlOptions};

pub const DATASTORE_NAME: &str = "s3";

/// S3DataStore stores content in a single bucket, keyed by `root_path/uid`.
///
/// The bucket is checked (and created if missing) once per instance, on the first write or
/// through an explicit [`S3DataStore::ensure_ready`]. Two instances starting at the same time
/// may both try to create the bucket; the store is expected to tolerate that.
pub struct S3DataStore {
    config: DataStoreConfig,
    client: Arc<dyn StoreClient>,
    bucket_initialized: OnceCell<()>,
}

impl S3DataStore {
    /// Creates a data store on top of an existing store client.
    ///
    /// # Arguments
    /// * `config` - Data store config, validated here.
    /// * `client` - The object store client.
    ///
    /// # Returns
    /// * `DataStoreResult<Self>` - Fails with a config error before any store call is made.
    pub fn new(config: DataStoreConfig, client: Arc<dyn StoreClient>) -> DataStoreResult<Self> {
        Ok(Self::with_validated_config(config.validate()?, client))
    }

    /// Creates a data store backed by AWS S3, with the AWS config loaded from the environment.
    pub async fn connect(config: DataStoreConfig) -> DataStoreResult<Self> {
        let config = config.validate()?;
        let client = AwsS3Client::from_env(&config).await;
        Ok(Self::with_validated_config(config, Arc::new(client)))
    }

    fn with_validated_config(config: DataStoreConfig, client: Arc<dyn StoreClient>) -> Self {
        Self { config, client, bucket_initialized: OnceCell::new() }
    }

    pub fn config(&self) -> &DataStoreConfig {
        &self.config
    }

    pub fn bucket_name(&self) -> &str {
        &self.config.bucket_name
    }

    /// Object key for a uid.
    pub fn full_path(&self, uid: &str) -> String {
        resolve(self.config.root_path(), uid)
    }

    /// Probes the bucket. Any probe failure counts as "does not exist".
    pub async fn bucket_exists(&self) -> bool {
        match self.client.get_bucket_location(self.bucket_name()).await {
            Ok(_) => true,
            Err(e) => {
                debug!(
                    log_type = "DataStorage",
                    category = "data_storage_bucket",
                    bucket = %self.bucket_name(),
                    error = %e,
                    "bucket probe failed"
                );
                false
            }
        }
    }

    /// Makes sure the bucket exists, creating it in the configured region if the probe fails.
    ///
    /// Runs at most once per instance; concurrent callers wait for the first one. If the
    /// create call fails the next caller tries again.
    pub async fn ensure_ready(&self) -> DataStoreResult<()> {
        self.bucket_initialized
            .get_or_try_init(|| async {
                if !self.bucket_exists().await {
                    info!(
                        log_type = "DataStorage",
                        category = "data_storage_bucket",
                        bucket = %self.bucket_name(),
                        region = ?self.config.region,
                        "Creating New Bucket"
                    );
                    self.client
                        .create_bucket(self.bucket_name(), self.config.region.clone(), self.config.bucket_acl)
                        .await?;
                }
                Ok::<(), DataStoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Stores the content and returns its uid.
    pub async fn write(&self, content: Content, options: WriteOptions) -> DataStoreResult<String> {
        self.ensure_ready().await?;

        let content_type = options.content_type.unwrap_or_else(|| content.mime_type());
        let uid = options.path.unwrap_or_else(|| generate_uid(content.name().unwrap_or(DEFAULT_NAME)));
        let key = self.full_path(&uid);

        let (body, mut metadata) = content.into_parts();
        metadata.extend(options.metadata);

        let request = PutObjectRequest {
            bucket: self.config.bucket_name.clone(),
            key,
            body,
            content_type,
            metadata,
            acl: options.acl.unwrap_or(self.config.acl),
            storage_class: options.storage_class.unwrap_or(self.config.storage_class),
            cache_control: options.cache_control,
            content_disposition: options.content_disposition,
            content_encoding: options.content_encoding,
        };
        debug!(
            log_type = "DataStorage",
            category = "data_storage_write",
            bucket = %request.bucket,
            key = %request.key,
            "writing content"
        );
        self.client.put_object(request).await?;

        Ok(uid)
    }

    /// Reads the content stored under `uid`, `None` if there is none.
    pub async fn read(&self, uid: &str) -> DataStoreResult<Option<StoredObject>> {
        let key = self.full_path(uid);
        match self.client.get_object(self.bucket_name(), &key).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => {
                debug!(
                    log_type = "DataStorage",
                    category = "data_storage_read",
                    bucket = %self.bucket_name(),
                    key = %key,
                    "no object stored under key"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the content stored under `uid`. Failures are logged and swallowed.
    pub async fn destroy(&self, uid: &str) {
        let key = self.full_path(uid);
        if let Err(e) = self.client.delete_object(self.bucket_name(), &key).await {
            warn!(
                log_type = "DataStorage",
                category = "data_storage_destroy",
                bucket = %self.bucket_name(),
                key = %key,
                "S3DataStore destroy error: {}",
                e
            );
        }
    }

    /// Public url for `uid`, or a signed one when `options.expires` is set.
    pub async fn url_for(&self, uid: &str, options: &UrlOptions) -> DataStoreResult<String> {
        let key = self.full_path(uid);

        if let Some(expiry) = &options.expires {
            let expires_in = expiry.expires_in(Utc::now())?;
            return Ok(self.client.signed_url(self.bucket_name(), &key, expires_in, &options.query).await?);
        }

        let scheme = options.scheme.as_deref().unwrap_or(&self.config.url_scheme);
        let host = match options.host.as_ref().or(self.config.url_host.as_ref()) {
            Some(host) => host.clone(),
            None => bucket_host(self.bucket_name(), &self.config.store_domain),
        };
        public_url(scheme, &host, &key)
    }
}

impl fmt::Debug for S3DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3DataStore")
            .field("config", &self.config)
            .field("bucket_initialized", &self.bucket_initialized.initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DataStore for S3DataStore {
    fn name(&self) -> &'static str {
        DATASTORE_NAME
    }

    async fn write(&self, content: Content, options: WriteOptions) -> DataStoreResult<String> {
        S3DataStore::write(self, content, options).await
    }

    async fn read(&self, uid: &str) -> DataStoreResult<Option<StoredObject>> {
        S3DataStore::read(self, uid).await
    }

    async fn destroy(&self, uid: &str) {
        S3DataStore::destroy(self, uid).await
    }

    async fn url_for(&self, uid: &str, options: &UrlOptions) -> DataStoreResult<String> {
        S3DataStore::url_for(self, uid, options).await
    }
}
