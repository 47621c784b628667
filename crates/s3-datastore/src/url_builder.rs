use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use url::Url;

use crate::error::{DataStoreError, DataStoreResult};
use crate::path::SEPARATOR;

/// Bucket names that can be used as a DNS label for virtual-hosted-style urls.
pub static SUBDOMAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]+[a-z0-9]$").expect("valid regex"));

/// When a signed url stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    At(DateTime<Utc>),
    In(Duration),
}

impl Expiry {
    /// Time left until expiry, measured from `now`. Must be in the future.
    pub fn expires_in(&self, now: DateTime<Utc>) -> DataStoreResult<Duration> {
        let duration = match self {
            Expiry::At(at) => (*at - now)
                .to_std()
                .map_err(|_| DataStoreError::InvalidExpiry(format!("{at} is in the past")))?,
            Expiry::In(duration) => *duration,
        };
        if duration.is_zero() {
            return Err(DataStoreError::InvalidExpiry("url would expire immediately".to_string()));
        }
        Ok(duration)
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::In(duration)
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Expiry::At(at)
    }
}

/// Options for [`crate::S3DataStore::url_for`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Makes the url signed and time limited
    pub expires: Option<Expiry>,
    /// Extra query parameters, only used for signed urls
    pub query: BTreeMap<String, String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
}

impl UrlOptions {
    pub fn expires(mut self, expiry: impl Into<Expiry>) -> Self {
        self.expires = Some(expiry.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// `bucket.domain` when the bucket is DNS safe, `domain/bucket` otherwise.
pub fn bucket_host(bucket_name: &str, store_domain: &str) -> String {
    if SUBDOMAIN_PATTERN.is_match(bucket_name) {
        format!("{bucket_name}.{store_domain}")
    } else {
        format!("{store_domain}/{bucket_name}")
    }
}

/// Characters escaped inside a single key segment. Mirrors the path segment set of the `url`
/// crate, `/` included.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Percent-encodes a store key for use as a url path. `/` separators are kept, empty segments
/// are kept, and `.`/`..` segments are escaped so the url path still names the exact key.
pub fn encode_key(key: &str) -> String {
    key.split(SEPARATOR).map(encode_segment).collect::<Vec<_>>().join("/")
}

fn encode_segment(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => utf8_percent_encode(segment, KEY_SEGMENT).to_string(),
    }
}

/// Builds `scheme://host/key`. `host` may carry a path (path-style addressing).
pub fn public_url(scheme: &str, host: &str, key: &str) -> DataStoreResult<String> {
    let base = Url::parse(&format!("{scheme}://{}/", host.trim_end_matches(SEPARATOR)))?;
    Ok(format!("{}/{}", base.as_str().trim_end_matches(SEPARATOR), encode_key(key)))
}
