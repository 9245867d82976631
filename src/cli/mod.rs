//! CLI commands for multiminio
//!
//! ```bash
//! # Probe every endpoint of a profile once
//! multiminio --config replicas.yaml --profile prod health
//!
//! # Keep monitoring until Ctrl-C
//! MULTIMINIO_ENDPOINTS=http://minio-1:9000,http://minio-2:9000 multiminio watch
//! ```

pub mod commands;

pub use commands::{cmd_health, cmd_watch, render_health_table};
