//! HTTP server for cask.
//!
//! Routes:
//!
//! - `POST /{bucket}/{key}` -- upload; responds `201` with the digest
//! - `GET|HEAD /{bucket}/{key}` -- download, with single-range and
//!   `If-Modified-Since` support
//! - `GET /` -- list configured buckets
//! - `GET /_health`, `GET /_info` -- liveness and build info
//! - `GET /metrics` -- per-request counters and a duration histogram in
//!   Prometheus text format
//!
//! Errors are JSON `{"code", "error", "description"}`; see
//! [`ServerError::status`] for the status mapping.

pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod metrics;
pub mod range;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ErrorBody, ServerError, ServerResult};
pub use hooks::{RequestObserver, RequestReport, TracingObserver};
pub use metrics::MetricsObserver;
pub use router::{build_router, AppState};
pub use server::CaskServer;
