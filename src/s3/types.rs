//! Object-storage types shared by all backends

use serde::{Deserialize, Serialize};

/// S3 Object metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Object {
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp (optional)
    pub last_modified: Option<String>,
    /// ETag (optional)
    pub etag: Option<String>,
}

impl S3Object {
    pub fn new(key: String, size: u64) -> Self {
        Self {
            key,
            size,
            last_modified: None,
            etag: None,
        }
    }
}

/// One page of a ListObjectsV2 listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    pub contents: Vec<S3Object>,
    /// Common prefixes (subdirectories when using delimiter)
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    /// Continuation token for next request
    pub next_continuation_token: Option<String>,
    pub prefix: Option<String>,
}

impl ListObjectsResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total size of the objects on this page
    pub fn total_size(&self) -> u64 {
        self.contents.iter().map(|o| o.size).sum()
    }
}

/// Result of a HEAD request on an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
}

impl From<&S3Object> for ObjectInfo {
    fn from(obj: &S3Object) -> Self {
        Self {
            key: obj.key.clone(),
            size: obj.size,
            etag: obj.etag.clone(),
            content_type: None,
            last_modified: obj.last_modified.clone(),
        }
    }
}
