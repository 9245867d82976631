//! In-memory replica with injectable faults

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use multiminio::s3::{HealthProbe, ListObjectsResponse, ObjectInfo, ObjectStore, Result, S3Object, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Answers normally
    Up,
    /// Refuses connections
    Down,
    /// Never answers
    Hang,
}

pub struct MemoryReplica {
    name: String,
    mode: Mutex<Mode>,
    buckets: Mutex<HashMap<String, BTreeMap<String, Bytes>>>,
    calls: AtomicUsize,
    probes: AtomicUsize,
}

fn s3_error(status: StatusCode, code: &str) -> StoreError {
    StoreError::S3Response {
        status,
        code: code.to_string(),
        message: code.to_string(),
    }
}

impl MemoryReplica {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mutex::new(Mode::Up),
            buckets: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        self.set_mode(mode);
        self
    }

    pub fn with_object(self, bucket: &str, key: &str, data: &'static [u8]) -> Self {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), Bytes::from_static(data));
        self
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Number of storage operations received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    async fn reachable(&self) -> Result<()> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Up => Ok(()),
            Mode::Down => Err(StoreError::Unavailable(format!("{} refused connection", self.name))),
            Mode::Hang => std::future::pending().await,
        }
    }

    async fn gate(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reachable().await
    }

    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut BTreeMap<String, Bytes>) -> Result<T>,
    ) -> Result<T> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get_mut(bucket) {
            Some(objects) => f(objects),
            None => Err(s3_error(StatusCode::NOT_FOUND, "NoSuchBucket")),
        }
    }
}

#[async_trait]
impl HealthProbe for MemoryReplica {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.reachable().await
    }
}

#[async_trait]
impl ObjectStore for MemoryReplica {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.gate().await?;
        self.with_bucket(bucket, |objects| {
            objects
                .get(key)
                .cloned()
                .ok_or_else(|| s3_error(StatusCode::NOT_FOUND, "NoSuchKey"))
        })
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<String> {
        self.gate().await?;
        self.with_bucket(bucket, |objects| {
            let etag = format!("\"{:08x}\"", data.len());
            objects.insert(key.to_string(), data);
            Ok(etag)
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.gate().await?;
        self.with_bucket(bucket, |objects| {
            objects.remove(key);
            Ok(())
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        _continuation_token: Option<&str>,
    ) -> Result<ListObjectsResponse> {
        self.gate().await?;
        self.with_bucket(bucket, |objects| {
            let mut page = ListObjectsResponse::new();
            page.prefix = prefix.map(str::to_string);
            page.contents = objects
                .iter()
                .filter(|(key, _)| prefix.map_or(true, |p| key.starts_with(p)))
                .map(|(key, data)| S3Object::new(key.clone(), data.len() as u64))
                .collect();
            Ok(page)
        })
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        self.gate().await?;
        self.with_bucket(bucket, |objects| {
            objects
                .get(key)
                .map(|data| ObjectInfo::from(&S3Object::new(key.to_string(), data.len() as u64)))
                .ok_or_else(|| s3_error(StatusCode::NOT_FOUND, "NoSuchKey"))
        })
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.gate().await?;
        Ok(self.buckets.lock().unwrap().contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> Result<()> {
        self.gate().await?;
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(s3_error(StatusCode::CONFLICT, "BucketAlreadyOwnedByYou"));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        self.gate().await?;
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket) {
            None => Err(s3_error(StatusCode::NOT_FOUND, "NoSuchBucket")),
            Some(objects) if !objects.is_empty() => {
                Err(s3_error(StatusCode::CONFLICT, "BucketNotEmpty"))
            }
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }
}
