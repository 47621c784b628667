use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DataStoreError, DataStoreResult};

pub const DEFAULT_URL_SCHEME: &str = "http";
pub const DEFAULT_STORE_DOMAIN: &str = "s3.amazonaws.com";

static URL_SCHEME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*$").expect("valid regex"));

/// Canned access control policy applied to stored objects (and optionally to a created bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl Acl {
    pub const ALL: [Acl; 7] = [
        Acl::Private,
        Acl::PublicRead,
        Acl::PublicReadWrite,
        Acl::AuthenticatedRead,
        Acl::AwsExecRead,
        Acl::BucketOwnerRead,
        Acl::BucketOwnerFullControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::AwsExecRead => "aws-exec-read",
            Acl::BucketOwnerRead => "bucket-owner-read",
            Acl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = DataStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Acl::ALL
            .into_iter()
            .find(|acl| acl.as_str() == s)
            .ok_or_else(|| DataStoreError::ConfigError(format!("Unknown acl: {s}")))
    }
}

/// Storage tier for stored objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    #[default]
    Standard,
    ReducedRedundancy,
    StandardIa,
    OnezoneIa,
    IntelligentTiering,
    Glacier,
    GlacierIr,
    DeepArchive,
}

impl StorageClass {
    pub const ALL: [StorageClass; 8] = [
        StorageClass::Standard,
        StorageClass::ReducedRedundancy,
        StorageClass::StandardIa,
        StorageClass::OnezoneIa,
        StorageClass::IntelligentTiering,
        StorageClass::Glacier,
        StorageClass::GlacierIr,
        StorageClass::DeepArchive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "STANDARD",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::Glacier => "GLACIER",
            StorageClass::GlacierIr => "GLACIER_IR",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageClass {
    type Err = DataStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageClass::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DataStoreError::ConfigError(format!("Unknown storage class: {s}")))
    }
}

/// Where the store client gets its credentials from.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Environment, shared profile, or instance/task role as resolved by the SDK.
    #[default]
    Ambient,
    Static {
        access_key_id: String,
        secret_access_key: String,
        #[serde(default)]
        session_token: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Ambient => f.write_str("Ambient"),
            Credentials::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"** redacted **")
                .finish_non_exhaustive(),
        }
    }
}

/// Represents the data store config with every recognised option.
///
/// Only `bucket_name` is required, everything else falls back to the defaults below when
/// deserialised or built through [`DataStoreConfig::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreConfig {
    /// S3 Bucket Name
    pub bucket_name: String,
    #[serde(default)]
    pub credentials: Credentials,
    /// Region used for the client and as the location constraint of a created bucket
    #[serde(default)]
    pub region: Option<String>,
    /// Acl of stored objects
    #[serde(default)]
    pub acl: Acl,
    /// Acl sent when the bucket is created, none by default
    #[serde(default)]
    pub bucket_acl: Option<Acl>,
    #[serde(default)]
    pub storage_class: StorageClass,
    #[serde(default = "default_url_scheme")]
    pub url_scheme: String,
    /// Host override for public urls, e.g. a CDN
    #[serde(default)]
    pub url_host: Option<String>,
    /// Prefix joined in front of every uid to form the object key
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default = "default_store_domain")]
    pub store_domain: String,
    /// Custom endpoint for S3 compatible stores, passed through to the SDK
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_url_scheme() -> String {
    DEFAULT_URL_SCHEME.to_string()
}

fn default_store_domain() -> String {
    DEFAULT_STORE_DOMAIN.to_string()
}

impl DataStoreConfig {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            credentials: Credentials::default(),
            region: None,
            acl: Acl::default(),
            bucket_acl: None,
            storage_class: StorageClass::default(),
            url_scheme: default_url_scheme(),
            url_host: None,
            root_path: None,
            store_domain: default_store_domain(),
            endpoint_url: None,
            force_path_style: false,
        }
    }

    /// Checks the config and normalises optional strings, so an empty `root_path` or
    /// `url_host` behaves as if it was never set.
    pub fn validate(mut self) -> DataStoreResult<Self> {
        if self.bucket_name.trim().is_empty() {
            return Err(DataStoreError::ConfigError("Bucket name is not set".to_string()));
        }
        if let Credentials::Static { access_key_id, secret_access_key, .. } = &self.credentials {
            if access_key_id.is_empty() || secret_access_key.is_empty() {
                return Err(DataStoreError::ConfigError(
                    "Static credentials need both an access key id and a secret access key".to_string(),
                ));
            }
        }
        if !URL_SCHEME_PATTERN.is_match(&self.url_scheme) {
            return Err(DataStoreError::ConfigError(format!("Invalid url scheme: {}", self.url_scheme)));
        }
        if self.store_domain.trim().is_empty() {
            return Err(DataStoreError::ConfigError("Store domain is not set".to_string()));
        }

        self.region = non_empty(self.region);
        self.url_host = non_empty(self.url_host);
        self.root_path = non_empty(self.root_path);
        self.endpoint_url = non_empty(self.endpoint_url);
        Ok(self)
    }

    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
