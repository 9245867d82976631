use crate::config::{ConfigError, FailoverConfig};
use crate::lb::{
    BackendHealthStats, BackendPool, FailoverError, FailoverExecutor, HealthCheckConfig,
    HealthMonitor, MonitorState, Routed,
};
use crate::s3::{HealthProbe, ListObjectsResponse, ObjectInfo, ObjectStore};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;

/// Failover client over a pool of replicated storage clients
///
/// Exposes the same operations as a single [`ObjectStore`]; every call is
/// routed to the best available backend and transparently retried on the
/// next one when it fails. A background [`HealthMonitor`] keeps the pool's
/// health fresh independently of request traffic and is shut down when the
/// client is dropped.
pub struct MultiClient<C> {
    config: FailoverConfig,
    pool: Arc<BackendPool<C>>,
    executor: FailoverExecutor,
    monitor: HealthMonitor<C>,
}

impl<C: HealthProbe> MultiClient<C> {
    /// Build the client and start health monitoring.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        clients: impl IntoIterator<Item = C>,
        config: FailoverConfig,
    ) -> Result<Self, ConfigError> {
        let client = Self::detached(clients, config)?;
        client.start_health_checks();
        Ok(client)
    }

    /// Build the client without starting health monitoring
    pub fn detached(
        clients: impl IntoIterator<Item = C>,
        config: FailoverConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = Arc::new(BackendPool::new(clients)?);
        let executor = FailoverExecutor::from_config(&config)?;
        let monitor = HealthMonitor::new(Arc::clone(&pool), HealthCheckConfig::from(&config));

        Ok(Self {
            config,
            pool,
            executor,
            monitor,
        })
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    pub fn pool(&self) -> &BackendPool<C> {
        &self.pool
    }

    /// Start health checks; returns false if already running
    pub fn start_health_checks(&self) -> bool {
        self.monitor.start()
    }

    /// Stop health checks; the last observed health is kept
    pub fn shutdown(&self) {
        self.monitor.shutdown();
    }

    pub async fn shutdown_and_wait(&self) {
        self.monitor.shutdown_and_wait().await;
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.monitor.state()
    }

    /// Probe every backend now, ignoring the minimum probe interval
    pub async fn check_health(&self) -> usize {
        self.monitor.check_all().await
    }

    pub fn health_stats(&self) -> Vec<BackendHealthStats> {
        self.monitor.health_stats()
    }

    /// Route an arbitrary client call through failover
    pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, FailoverError>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = crate::s3::Result<T>>,
    {
        self.execute_traced(operation, op)
            .await
            .map(|routed| routed.value)
    }

    /// Like [`execute`](Self::execute), also reporting which backend served
    /// the call and the attempts that failed first
    pub async fn execute_traced<T, F, Fut>(
        &self,
        operation: &str,
        op: F,
    ) -> Result<Routed<T>, FailoverError>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = crate::s3::Result<T>>,
    {
        self.executor.execute(&self.pool, operation, op).await
    }
}

impl<C: ObjectStore> MultiClient<C> {
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, FailoverError> {
        self.execute("get_object", |client| async move {
            client.get_object(bucket, key).await
        })
        .await
    }

    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<String, FailoverError> {
        self.execute("put_object", |client| {
            let data = data.clone();
            async move { client.put_object(bucket, key, data).await }
        })
        .await
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), FailoverError> {
        self.execute("delete_object", |client| async move {
            client.delete_object(bucket, key).await
        })
        .await
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ListObjectsResponse, FailoverError> {
        self.execute("list_objects", |client| async move {
            client
                .list_objects(bucket, prefix, continuation_token)
                .await
        })
        .await
    }

    pub async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, FailoverError> {
        self.execute("stat_object", |client| async move {
            client.stat_object(bucket, key).await
        })
        .await
    }

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, FailoverError> {
        self.execute("bucket_exists", |client| async move {
            client.bucket_exists(bucket).await
        })
        .await
    }

    pub async fn make_bucket(&self, bucket: &str) -> Result<(), FailoverError> {
        self.execute("make_bucket", |client| async move {
            client.make_bucket(bucket).await
        })
        .await
    }

    pub async fn remove_bucket(&self, bucket: &str) -> Result<(), FailoverError> {
        self.execute("remove_bucket", |client| async move {
            client.remove_bucket(bucket).await
        })
        .await
    }
}

impl<C> std::fmt::Debug for MultiClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiClient")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish()
    }
}
