//! Storage client capabilities
//!
//! This module provides:
//! - The [`HealthProbe`] and [`ObjectStore`] traits the failover engine routes over
//! - [`StoreError`] and its retryable/authoritative classification
//! - [`HttpProbe`], a MinIO liveness probe (`/minio/health/live`)
//! - Object-storage response types

pub mod client;
pub mod probe;
pub mod types;

pub use client::{HealthProbe, ObjectStore, Result, StoreError};
pub use probe::{HttpProbe, DEFAULT_HEALTH_PATH};
pub use types::{ListObjectsResponse, ObjectInfo, S3Object};
