use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};

/// What the server did for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestReport {
    /// Handler name: `create`, `get`, `list`, or `other`.
    pub operation: &'static str,
    pub method: Method,
    pub status: StatusCode,
    pub bucket: Option<String>,
    /// Body bytes received from the client.
    pub request_bytes: u64,
    /// Body bytes sent to the client, as declared when the response started.
    pub response_bytes: u64,
    pub duration: Duration,
}

/// Receives a report after every request. Metrics exporters plug in here.
#[async_trait]
pub trait RequestObserver: Send + Sync {
    async fn on_request(&self, report: &RequestReport);
}

/// Emits each report as a structured `tracing` event.
pub struct TracingObserver;

#[async_trait]
impl RequestObserver for TracingObserver {
    async fn on_request(&self, report: &RequestReport) {
        tracing::info!(
            operation = report.operation,
            method = %report.method,
            status = report.status.as_u16(),
            bucket = report.bucket.as_deref().unwrap_or("-"),
            request_bytes = report.request_bytes,
            response_bytes = report.response_bytes,
            duration_ns = report.duration.as_nanos() as u64,
            "request"
        );
    }
}
