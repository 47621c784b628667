//! The content item handed to the data store by the attachment library.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::client::ObjectBody;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Bytes (in memory or on disk) plus the name, mime type and metadata that travel with them.
#[derive(Debug, Clone)]
pub struct Content {
    body: ObjectBody,
    name: Option<String>,
    mime_type: Option<String>,
    meta: HashMap<String, String>,
}

impl Content {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { body: ObjectBody::Bytes(data.into()), name: None, mime_type: None, meta: HashMap::new() }
    }

    /// Content backed by a file. The name defaults to the file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path: PathBuf = path.as_ref().to_path_buf();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self { body: ObjectBody::File(path), name, mime_type: None, meta: HashMap::new() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, meta: HashMap<String, String>) -> Self {
        self.meta.extend(meta);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared mime type, else one guessed from the name, else `application/octet-stream`.
    pub fn mime_type(&self) -> String {
        if let Some(mime_type) = &self.mime_type {
            return mime_type.clone();
        }
        self.name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string()
    }

    pub fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    pub fn body(&self) -> &ObjectBody {
        &self.body
    }

    pub(crate) fn into_parts(self) -> (ObjectBody, HashMap<String, String>) {
        (self.body, self.meta)
    }
}
