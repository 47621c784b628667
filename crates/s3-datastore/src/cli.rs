use clap::Args;

use crate::config::{Acl, Credentials, DataStoreConfig, StorageClass, DEFAULT_STORE_DOMAIN, DEFAULT_URL_SCHEME};
use crate::error::DataStoreError;

/// Parameters used to config the S3 data store. Meant to be flattened into the CLI of the
/// application that owns the store.
#[derive(Debug, Clone, Args)]
#[group()]
pub struct S3DataStoreCliArgs {
    /// The name of the S3 bucket.
    #[arg(env = "DATASTORE_S3_BUCKET_NAME", long)]
    pub s3_bucket_name: Option<String>,

    /// Access key id. Leave unset (with the secret) to use ambient AWS credentials.
    #[arg(env = "DATASTORE_S3_ACCESS_KEY_ID", long)]
    pub s3_access_key_id: Option<String>,

    #[arg(env = "DATASTORE_S3_SECRET_ACCESS_KEY", long, hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    #[arg(env = "DATASTORE_S3_SESSION_TOKEN", long, hide_env_values = true)]
    pub s3_session_token: Option<String>,

    /// Region of the client, also used when the bucket has to be created.
    #[arg(env = "DATASTORE_S3_REGION", long)]
    pub s3_region: Option<String>,

    /// Canned acl of stored objects, e.g. `private` or `public-read`.
    #[arg(env = "DATASTORE_S3_ACL", long)]
    pub s3_acl: Option<String>,

    /// Canned acl sent when creating the bucket.
    #[arg(env = "DATASTORE_S3_BUCKET_ACL", long)]
    pub s3_bucket_acl: Option<String>,

    /// Storage class of stored objects, e.g. `STANDARD` or `STANDARD_IA`.
    #[arg(env = "DATASTORE_S3_STORAGE_CLASS", long)]
    pub s3_storage_class: Option<String>,

    #[arg(env = "DATASTORE_S3_URL_SCHEME", long, default_value = DEFAULT_URL_SCHEME)]
    pub s3_url_scheme: String,

    /// Host used in public urls instead of the bucket host.
    #[arg(env = "DATASTORE_S3_URL_HOST", long)]
    pub s3_url_host: Option<String>,

    /// Prefix put in front of every key.
    #[arg(env = "DATASTORE_S3_ROOT_PATH", long)]
    pub s3_root_path: Option<String>,

    #[arg(env = "DATASTORE_S3_STORE_DOMAIN", long, default_value = DEFAULT_STORE_DOMAIN)]
    pub s3_store_domain: String,

    /// Endpoint of an S3 compatible store (MinIO, localstack, ...).
    #[arg(env = "DATASTORE_S3_ENDPOINT_URL", long)]
    pub s3_endpoint_url: Option<String>,

    #[arg(env = "DATASTORE_S3_FORCE_PATH_STYLE", long)]
    pub s3_force_path_style: bool,
}

impl TryFrom<S3DataStoreCliArgs> for DataStoreConfig {
    type Error = DataStoreError;

    fn try_from(args: S3DataStoreCliArgs) -> Result<Self, Self::Error> {
        let bucket_name =
            args.s3_bucket_name.ok_or_else(|| DataStoreError::ConfigError("Bucket name Not found".to_string()))?;

        let credentials = match (args.s3_access_key_id, args.s3_secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                Credentials::Static { access_key_id, secret_access_key, session_token: args.s3_session_token }
            }
            (None, None) => Credentials::Ambient,
            _ => {
                return Err(DataStoreError::ConfigError(
                    "Access key id and secret access key must be given together".to_string(),
                ))
            }
        };

        let config = DataStoreConfig {
            bucket_name,
            credentials,
            region: args.s3_region,
            acl: args.s3_acl.as_deref().map(str::parse::<Acl>).transpose()?.unwrap_or_default(),
            bucket_acl: args.s3_bucket_acl.as_deref().map(str::parse::<Acl>).transpose()?,
            storage_class: args.s3_storage_class.as_deref().map(str::parse::<StorageClass>).transpose()?.unwrap_or_default(),
            url_scheme: args.s3_url_scheme,
            url_host: args.s3_url_host,
            root_path: args.s3_root_path,
            store_domain: args.s3_store_domain,
            endpoint_url: args.s3_endpoint_url,
            force_path_style: args.s3_force_path_style,
        };
        config.validate()
    }
}
