//! S3 backed data store for an attachment library.
//!
//! Content handed to [`S3DataStore::write`] is stored in a single bucket under
//! `root_path/<timestamp>/<uuid>/<name>` and can be read back, destroyed, or linked to through
//! a public or signed url.

// AWS SDK errors carried in `StorageError` are large.
#![allow(clippy::result_large_err)]

pub mod cli;
pub mod client;
pub mod config;
pub mod content;
pub mod datastore;
pub mod error;
pub mod path;
mod store;
pub mod uid;
pub mod url_builder;

#[cfg(test)]
pub mod tests;

pub use cli::S3DataStoreCliArgs;
pub use client::{AwsS3Client, InMemoryStoreClient, StorageError, StoreClient, StoredObject};
pub use config::{Acl, Credentials, DataStoreConfig, StorageClass};
pub use content::Content;
pub use datastore::{DataStore, WriteOptions};
pub use error::{DataStoreError, DataStoreResult};
pub use store::{S3DataStore, DATASTORE_NAME};
pub use url_builder::{Expiry, UrlOptions};
