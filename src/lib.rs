//! multiminio - failover routing over replicated MinIO/S3 endpoints
//!
//! ```rust,no_run
//! use multiminio::{FailoverConfig, MultiClient};
//! # use multiminio::s3::ObjectStore;
//!
//! # async fn example<C: ObjectStore>(replicas: Vec<C>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = MultiClient::new(replicas, FailoverConfig::default())?;
//! let data = client.get_object("market-data", "path/object").await?;
//! println!("{} bytes", data.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod lb;
pub mod s3;

pub use crate::core::MultiClient;
pub use config::{Config, ConfigError, FailoverConfig};
pub use lb::{FailoverError, HealthStatus, Routed};
