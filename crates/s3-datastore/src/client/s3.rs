use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl};
use aws_sdk_s3::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::client::{ObjectBody, PutObjectRequest, StorageError, StoreClient, StoredObject};
use crate::config::{Acl, Credentials, DataStoreConfig};

/// Region S3 treats as the default; buckets there are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Provider name reported by the SDK for credentials taken from the config.
const STATIC_CREDENTIALS_PROVIDER: &str = "s3-datastore-config";

/// AwsS3Client wraps the AWS S3 client for a data store.
#[derive(Clone, Debug)]
pub struct AwsS3Client {
    pub(crate) client: Arc<Client>,
    region: Option<String>,
}

impl AwsS3Client {
    /// Creates a new client from a shared AWS config, applying the store specific options
    /// of the data store config on top of it.
    ///
    /// # Arguments
    /// * `aws_config` - The AWS configuration.
    /// * `config` - The validated data store config.
    pub fn new(aws_config: &SdkConfig, config: &DataStoreConfig) -> Self {
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(aws_config);

        if let Some(region) = &config.region {
            s3_config_builder = s3_config_builder.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }
        if let Credentials::Static { access_key_id, secret_access_key, session_token } = &config.credentials {
            s3_config_builder = s3_config_builder.credentials_provider(aws_credential_types::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                STATIC_CREDENTIALS_PROVIDER,
            ));
        }
        s3_config_builder = s3_config_builder.force_path_style(config.force_path_style);

        let s3_config = s3_config_builder.build();
        let region = s3_config.region().map(|r| r.to_string());
        let client = Client::from_conf(s3_config);

        Self { client: Arc::new(client), region }
    }

    /// Loads the AWS config from the environment (env vars, profile, instance role) and
    /// builds the client from it.
    pub async fn from_env(config: &DataStoreConfig) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(&aws_config, config)
    }

    /// Returns the region the client was configured with, if any.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

#[async_trait]
impl StoreClient for AwsS3Client {
    /// Put the data into the bucket with the specified key.
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), StorageError> {
        let body = match request.body {
            ObjectBody::Bytes(bytes) => ByteStream::from(bytes),
            ObjectBody::File(path) => {
                ByteStream::from_path(&path).await.map_err(|e| StorageError::ObjectStreamError(e.to_string()))?
            }
        };

        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(body)
            .content_type(&request.content_type)
            .set_metadata(Some(request.metadata))
            .acl(ObjectCannedAcl::from(request.acl.as_str()))
            .storage_class(aws_sdk_s3::types::StorageClass::from(request.storage_class.as_str()))
            .set_cache_control(request.cache_control)
            .set_content_disposition(request.content_disposition)
            .set_content_encoding(request.content_encoding)
            .send()
            .await?;

        tracing::debug!(
            log_type = "DataStorage",
            category = "data_storage_call",
            "Successfully put data into {}. key={}",
            request.bucket,
            request.key
        );
        Ok(())
    }

    /// Get the data from the bucket with the specified key.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() });
            }
            Err(err) => return Err(err.into()),
        };

        let metadata = output.metadata().cloned().unwrap_or_default();
        let content_type = output.content_type().map(str::to_string);
        let data_stream =
            output.body.collect().await.map_err(|e| StorageError::ObjectStreamError(e.to_string()))?;
        let data = data_stream.into_bytes();

        tracing::debug!(
            log_type = "DataStorage",
            category = "data_storage_call",
            data_bytes = data.len(),
            "Successfully retrieved data from {}, key={}",
            bucket,
            key
        );
        Ok(StoredObject { data, metadata, content_type })
    }

    /// Delete the data from the bucket with the specified key.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        Ok(self.client.delete_object().bucket(bucket).key(key).send().await.map(|_| ())?)
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        let output = self.client.get_bucket_location().bucket(bucket).send().await?;
        // S3 reports us-east-1 as an empty constraint
        Ok(output.location_constraint().map(|c| c.as_str().to_string()).filter(|c| !c.is_empty()))
    }

    async fn create_bucket(
        &self,
        bucket: &str,
        location: Option<String>,
        acl: Option<Acl>,
    ) -> Result<(), StorageError> {
        let region = location.or_else(|| self.region.clone()).unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut bucket_builder =
            self.client.create_bucket().bucket(bucket).set_acl(acl.map(|acl| BucketCannedAcl::from(acl.as_str())));

        if region != DEFAULT_REGION {
            let constraint = BucketLocationConstraint::from(region.as_str());
            let cfg = CreateBucketConfiguration::builder().location_constraint(constraint).build();
            bucket_builder = bucket_builder.create_bucket_configuration(cfg);
        }

        bucket_builder.send().await?;
        Ok(())
    }

    /// Presigns a GET for the object. The S3 `response-*` overrides and `versionId` go through
    /// their request fields, any other parameter is appended to the request uri before signing
    /// so it ends up covered by the signature.
    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        query: &BTreeMap<String, String>,
    ) -> Result<String, StorageError> {
        let presigning_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::PresigningConfigError(e.to_string()))?;

        let mut request = self.client.get_object().bucket(bucket).key(key);
        let mut extra_params = Vec::new();
        for (name, value) in query {
            request = match name.as_str() {
                "response-content-type" => request.response_content_type(value),
                "response-content-disposition" => request.response_content_disposition(value),
                "response-content-encoding" => request.response_content_encoding(value),
                "response-content-language" => request.response_content_language(value),
                "response-cache-control" => request.response_cache_control(value),
                "versionId" => request.version_id(value),
                _ => {
                    extra_params.push((name.clone(), value.clone()));
                    request
                }
            };
        }

        let presigned = if extra_params.is_empty() {
            request.presigned(presigning_config).await?
        } else {
            request
                .customize()
                .mutate_request(move |http_request| {
                    let uri = with_query_params(http_request.uri(), &extra_params);
                    if let Err(e) = http_request.set_uri(uri) {
                        tracing::warn!(
                            log_type = "DataStorage",
                            category = "data_storage_call",
                            "Failed to add query parameters to signed url: {}",
                            e
                        );
                    }
                })
                .presigned(presigning_config)
                .await?
        };
        Ok(presigned.uri().to_string())
    }
}

/// Everything but the SigV4 unreserved characters gets escaped, so the signer's canonical
/// query matches what ends up in the url.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Appends `params` to the query of `uri`.
fn with_query_params(uri: &str, params: &[(String, String)]) -> String {
    let encoded = params
        .iter()
        .map(|(name, value)| {
            format!("{}={}", utf8_percent_encode(name, QUERY_COMPONENT), utf8_percent_encode(value, QUERY_COMPONENT))
        })
        .collect::<Vec<_>>()
        .join("&");
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}{encoded}")
}
