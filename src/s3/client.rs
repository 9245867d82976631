//! Storage client capabilities consumed by the failover engine
//!
//! The engine never speaks the object-storage protocol itself. Anything that
//! can answer a liveness probe ([`HealthProbe`]) can be health-tracked, and
//! anything that additionally implements [`ObjectStore`] can be routed through
//! [`crate::MultiClient`].

use crate::s3::types::{ListObjectsResponse, ObjectInfo};
use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use thiserror::Error;

/// Storage client errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("Hyper error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("S3 error: {status} {code} - {message}")]
    S3Response {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("Invalid response: {status} - {message}")]
    InvalidResponse { status: StatusCode, message: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hyper_util::client::legacy::Error> for StoreError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl StoreError {
    /// Whether another replica could plausibly answer differently.
    ///
    /// Transport problems and 5xx service errors say something about the
    /// backend; 4xx service errors and malformed responses are the request's
    /// real answer and would be repeated by every replica.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::S3Response { status, .. } => status.is_server_error(),
            StoreError::InvalidResponse { status, .. } => status.is_server_error(),
            StoreError::InvalidUrl(_) | StoreError::Http(_) => false,
            _ => true,
        }
    }

    /// The S3 error code, when the backend returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::S3Response { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Lightweight liveness check for one backend
#[async_trait]
pub trait HealthProbe: Send + Sync + 'static {
    /// Endpoint label used in logs and health statistics
    fn endpoint(&self) -> &str;

    /// Returns `Ok(())` when the backend is live.
    ///
    /// Implementations need not bound their own duration; the prober wraps
    /// every call in `health_check_timeout`.
    async fn probe(&self) -> Result<()>;
}

/// Object-storage operations routed by [`crate::MultiClient`]
#[async_trait]
pub trait ObjectStore: HealthProbe {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Returns the ETag of the stored object
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<String>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ListObjectsResponse>;

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn make_bucket(&self, bucket: &str) -> Result<()>;

    async fn remove_bucket(&self, bucket: &str) -> Result<()>;
}
