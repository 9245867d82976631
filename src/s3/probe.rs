//! MinIO liveness probe over HTTP(S)

use crate::s3::client::{HealthProbe, Result, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use std::time::Duration;

/// MinIO's unauthenticated liveness endpoint
pub const DEFAULT_HEALTH_PATH: &str = "/minio/health/live";

/// Probes `GET {endpoint}{path}` and reports live only on `200 OK`.
///
/// Clone is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct HttpProbe {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    endpoint: String,
    url: String,
}

impl HttpProbe {
    /// Create a probe for `endpoint` using [`DEFAULT_HEALTH_PATH`].
    ///
    /// Endpoints without a scheme are treated as plain http, matching how
    /// MinIO clients are usually configured with a bare `host:port`.
    /// `insecure` disables certificate and hostname verification.
    pub fn new(endpoint: &str, insecure: bool) -> Result<Self> {
        Self::with_path(endpoint, DEFAULT_HEALTH_PATH, insecure)
    }

    pub fn with_path(endpoint: &str, path: &str, insecure: bool) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint);
        let url = format!("{}/{}", endpoint, path.trim_start_matches('/'));
        url::Url::parse(&url)?;

        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(10)));

        let tls = if insecure {
            tracing::warn!(endpoint = %endpoint, "certificate verification disabled for health probe");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?
        } else {
            TlsConnector::new()?
        };
        let https = HttpsConnector::from((http, tls.into()));

        // Probes are infrequent; keep at most one idle connection per host.
        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(1)
            .build(https);

        Ok(Self {
            client,
            endpoint,
            url,
        })
    }

    /// Full URL that is probed
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn probe(&self) -> Result<()> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(&self.url)
            .body(Full::new(Bytes::new()))?;

        let response = self.client.request(request).await?;
        let status = response.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(StoreError::InvalidResponse {
                status,
                message: format!("health endpoint {} returned {}", self.url, status),
            })
        }
    }
}
