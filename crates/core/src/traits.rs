//! ObjectStore trait definition
//!
//! This trait defines the single-request primitives the transfer engine is
//! built on. It keeps the engine independent of the HTTP client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata for one object, as returned by HEAD
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object name
    pub name: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Human-readable size
    pub size_human: String,

    /// Last-Modified header, as sent by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// ETag (MD5 of the content, or of the concatenated etags for manifests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// `X-Object-Manifest` value; present only for segmented objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    /// User metadata from `X-Object-Meta-*` headers
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a plain object
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes: size,
            size_human: humansize::format_size(size, humansize::BINARY),
            ..Default::default()
        }
    }

    /// Whether the object is a manifest over segments
    pub fn is_segmented(&self) -> bool {
        self.manifest.is_some()
    }
}

/// Container statistics, as returned by HEAD on the container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub object_count: u64,
    pub bytes_used: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// One entry of a container listing
///
/// Field names follow the JSON the service returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,

    #[serde(rename = "bytes", default)]
    pub size_bytes: u64,

    #[serde(default)]
    pub last_modified: String,

    #[serde(rename = "hash", default)]
    pub etag: String,

    #[serde(default)]
    pub content_type: String,
}

/// Options for a single listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only return names starting with this prefix
    pub prefix: Option<String>,

    /// Only return names sorting after this one (pagination)
    pub marker: Option<String>,

    /// Maximum number of entries in the page
    pub limit: Option<usize>,
}

/// Options for an object PUT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Sent as `X-Object-Meta-{key}: {value}`
    pub metadata: BTreeMap<String, String>,

    /// Sent as `X-Object-Manifest`; turns the object into a manifest
    pub manifest: Option<String>,

    /// Sent as `Content-Type`
    pub content_type: Option<String>,
}

/// Trait for Swift-compatible storage operations
///
/// This trait is implemented by the HTTP adapter and can be mocked for testing.
/// Every method issues exactly one request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get object metadata
    async fn head_object(&self, bucket: &str, name: &str) -> Result<ObjectInfo>;

    /// Get container statistics
    async fn head_container(&self, bucket: &str) -> Result<ContainerInfo>;

    /// Get object content as bytes
    async fn get_object(&self, bucket: &str, name: &str) -> Result<Vec<u8>>;

    /// Create or replace an object
    async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<()>;

    /// Delete one object
    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()>;

    /// List one page of a container
    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<Vec<ListingEntry>>;

    /// Create a container; succeeds if it already exists
    async fn create_container(&self, bucket: &str) -> Result<()>;
}
