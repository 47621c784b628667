use std::collections::HashMap;

use async_trait::async_trait;

use crate::client::StoredObject;
use crate::config::{Acl, StorageClass};
use crate::content::Content;
use crate::error::DataStoreResult;
use crate::url_builder::UrlOptions;

/// Per-write options. Anything set here wins over what the data store would use by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Explicit uid to store under, overwriting any object already there
    pub path: Option<String>,
    pub content_type: Option<String>,
    pub acl: Option<Acl>,
    pub storage_class: Option<StorageClass>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    /// Merged over the content's own metadata
    pub metadata: HashMap<String, String>,
}

impl WriteOptions {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = Some(storage_class);
        self
    }

    pub fn cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn content_disposition(mut self, content_disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(content_disposition.into());
        self
    }

    pub fn content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(content_encoding.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// DataStore is what the attachment library talks to. Stores are picked by [`DataStore::name`].
///
/// Uids returned by `write` are opaque handles for the other three operations.
#[async_trait]
pub trait DataStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, content: Content, options: WriteOptions) -> DataStoreResult<String>;

    /// `Ok(None)` when nothing is stored under the uid.
    async fn read(&self, uid: &str) -> DataStoreResult<Option<StoredObject>>;

    /// Best effort, failures are logged and never returned.
    async fn destroy(&self, uid: &str);

    async fn url_for(&self, uid: &str, options: &UrlOptions) -> DataStoreResult<String>;
}
