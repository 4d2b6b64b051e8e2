use std::io;
use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use cask_store::StoreError;
use cask_types::{Bucket, DigestAlgorithm};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::{ServerError, ServerResult};
use crate::hooks::{RequestObserver, RequestReport};
use crate::range::{content_range, parse_range_header, ByteRange};
use crate::router::AppState;

/// Body of `201 Created`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// Handling time in nanoseconds.
    pub duration: u64,
    pub file: FileResponse,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResponse {
    pub bucket: Bucket,
    pub key: String,
    pub size: u64,
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex.
    pub digest: String,
}

/// Body of `GET /`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketListResponse {
    pub count: usize,
    /// Handling time in nanoseconds.
    pub duration: u64,
    pub buckets: Vec<Bucket>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

fn elapsed_nanos(began: Instant) -> u64 {
    began.elapsed().as_nanos() as u64
}

/// HTTP-date as used by `Last-Modified`.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// `If-Modified-Since` compares at whole-second precision, the resolution
/// of HTTP dates.
fn not_modified(headers: &HeaderMap, last_modified: DateTime<Utc>) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
        .is_some_and(|since| last_modified.timestamp() <= since.timestamp())
}

fn response_len(response: &Response) -> u64 {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0)
}

/// Turn a handler outcome into a response and hand the report to the observer.
async fn finish(
    state: &AppState,
    mut report: RequestReport,
    began: Instant,
    result: ServerResult<Response>,
) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    report.status = response.status();
    report.response_bytes = response_len(&response);
    report.duration = began.elapsed();
    state.metrics.on_request(&report).await;
    state.observer.on_request(&report).await;
    response
}

fn new_report(operation: &'static str, method: Method, bucket: Option<&str>) -> RequestReport {
    RequestReport {
        operation,
        method,
        status: StatusCode::OK,
        bucket: bucket.map(str::to_string),
        request_bytes: 0,
        response_bytes: 0,
        duration: Default::default(),
    }
}

// ---------------------------------------------------------------------------
// POST /{bucket}/{key}
// ---------------------------------------------------------------------------

pub async fn create_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let began = Instant::now();
    let mut report = new_report("create", Method::POST, Some(&bucket));
    let result = create(&state, &bucket, &key, &headers, body, began, &mut report).await;
    finish(&state, report, began, result).await
}

async fn create(
    state: &AppState,
    bucket: &str,
    key: &str,
    headers: &HeaderMap,
    body: Body,
    began: Instant,
    report: &mut RequestReport,
) -> ServerResult<Response> {
    let bucket = state.provider.resolve(bucket).await?;

    let expected_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let stream = body.into_data_stream().map_err(io::Error::other);
    let mut reader = StreamReader::new(stream);

    let created = state.fs.create(&bucket, key, &mut reader, expected_len).await?;
    report.request_bytes = created.size();

    let response = CreatedResponse {
        duration: elapsed_nanos(began),
        file: FileResponse {
            key: created.info.key.to_string(),
            size: created.size(),
            algorithm: created.hash().algorithm(),
            digest: created.hash().to_hex(),
            bucket,
        },
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

// ---------------------------------------------------------------------------
// GET|HEAD /{bucket}/{key}
// ---------------------------------------------------------------------------

pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let began = Instant::now();
    let report = new_report("get", method, Some(&bucket));
    let result = get(&state, &bucket, &key, &headers).await;
    finish(&state, report, began, result).await
}

async fn get(state: &AppState, bucket: &str, key: &str, headers: &HeaderMap) -> ServerResult<Response> {
    let bucket = state.provider.resolve(bucket).await?;
    let object = state.fs.open(&bucket, key).await?;
    let size = object.size();
    let last_modified = HeaderValue::from_str(&http_date(object.last_modified()))
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    if not_modified(headers, object.last_modified()) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response.headers_mut().insert(header::LAST_MODIFIED, last_modified);
        return Ok(response);
    }

    let requested = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map_or(ByteRange::Full, |v| parse_range_header(v, size));
    let (status, range) = match requested {
        ByteRange::Full => (StatusCode::OK, 0..size),
        ByteRange::Partial(range) => (StatusCode::PARTIAL_CONTENT, range),
        ByteRange::Unsatisfiable => {
            return Err(StoreError::RangeNotSatisfiable { start: size, end: size, size }.into())
        }
    };

    let length = range.end - range.start;
    let partial = status == StatusCode::PARTIAL_CONTENT;
    let range_header = partial.then(|| content_range(&range, size));
    let reader = object.read_range(range).await?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(reader)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::LAST_MODIFIED, last_modified);
    if let Some(value) = range_header {
        headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&value).map_err(|e| ServerError::Internal(e.to_string()))?,
        );
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub async fn list_buckets(State(state): State<AppState>) -> Response {
    let began = Instant::now();
    let report = new_report("list", Method::GET, None);
    let result = list(&state, began).await;
    finish(&state, report, began, result).await
}

async fn list(state: &AppState, began: Instant) -> ServerResult<Response> {
    let buckets = state.provider.list().await?;
    let response = BucketListResponse {
        count: buckets.len(),
        duration: elapsed_nanos(began),
        buckets,
    };
    Ok(Json(response).into_response())
}

// ---------------------------------------------------------------------------
// Service endpoints
// ---------------------------------------------------------------------------

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "cask",
        "version": env!("CARGO_PKG_VERSION"),
        "digest": state.fs.algorithm(),
    }))
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(),
    )
        .into_response()
}

/// Fallback for unrouted paths, in the same JSON shape as other errors.
pub async fn not_found_handler() -> Response {
    let status = StatusCode::NOT_FOUND;
    let body = crate::error::ErrorBody {
        code: status.as_u16(),
        error: "no such route".into(),
        description: status.canonical_reason().unwrap_or_default().into(),
    };
    (status, Json(body)).into_response()
}
