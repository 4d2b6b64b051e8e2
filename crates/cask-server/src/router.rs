use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use cask_provider::Provider;
use cask_store::FileSystem;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::hooks::{RequestObserver, TracingObserver};
use crate::metrics::MetricsObserver;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub fs: Arc<dyn FileSystem>,
    pub observer: Arc<dyn RequestObserver>,
    /// Always fed, in addition to `observer`; rendered at `/metrics`.
    pub metrics: Arc<MetricsObserver>,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            provider,
            fs,
            observer: Arc::new(TracingObserver),
            metrics: Arc::new(MetricsObserver::new()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Build the axum router with all cask endpoints.
///
/// `GET` routes answer `HEAD` as well. Uploads are streamed, so axum's
/// default body limit is lifted; bucket policy bounds object size instead.
pub fn build_router(state: AppState, max_in_flight: usize) -> Router {
    Router::new()
        .route("/", get(handler::list_buckets))
        .route("/_health", get(handler::health_handler))
        .route("/_info", get(handler::info_handler))
        .route("/metrics", get(handler::metrics_handler))
        .route(
            "/:bucket/*key",
            get(handler::get_object).post(handler::create_object),
        )
        .fallback(handler::not_found_handler)
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
        .layer(GlobalConcurrencyLimitLayer::new(max_in_flight.max(1)))
        .layer(TraceLayer::new_for_http())
}
