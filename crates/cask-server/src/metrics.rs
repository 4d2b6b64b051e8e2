use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::hooks::{RequestObserver, RequestReport};

/// Upper bounds of the duration histogram, in nanoseconds: 1ms up to 10s.
pub const DURATION_BUCKETS_NS: [u64; 9] = [
    1_000_000,
    5_000_000,
    10_000_000,
    50_000_000,
    100_000_000,
    500_000_000,
    1_000_000_000,
    5_000_000_000,
    10_000_000_000,
];

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Labels {
    method: String,
    operation: &'static str,
    status: u16,
    bucket: String,
}

impl Labels {
    fn from_report(report: &RequestReport) -> Self {
        Self {
            method: report.method.as_str().to_string(),
            operation: report.operation,
            status: report.status.as_u16(),
            bucket: report.bucket.clone().unwrap_or_default(),
        }
    }

    fn render(&self, out: &mut String, le: Option<&str>) {
        let _ = write!(
            out,
            "{{method=\"{}\",operation=\"{}\",status=\"{}\",bucket=\"{}\"",
            escape(&self.method),
            escape(self.operation),
            self.status,
            escape(&self.bucket),
        );
        if let Some(le) = le {
            let _ = write!(out, ",le=\"{le}\"");
        }
        out.push('}');
    }
}

#[derive(Clone, Debug, Default)]
struct Series {
    requests: u64,
    duration_ns: u64,
    request_bytes: u64,
    response_bytes: u64,
    /// Non-cumulative counts per entry of [`DURATION_BUCKETS_NS`], then `+Inf`.
    histogram: [u64; DURATION_BUCKETS_NS.len() + 1],
}

/// Aggregates request reports into Prometheus series keyed by
/// method, operation, status, and bucket.
#[derive(Default)]
pub struct MetricsObserver {
    series: Mutex<BTreeMap<Labels, Series>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, report: &RequestReport) {
        let nanos = u64::try_from(report.duration.as_nanos()).unwrap_or(u64::MAX);
        let slot = DURATION_BUCKETS_NS
            .iter()
            .position(|&bound| nanos <= bound)
            .unwrap_or(DURATION_BUCKETS_NS.len());

        let mut series = self.series.lock().unwrap();
        let entry = series.entry(Labels::from_report(report)).or_default();
        entry.requests += 1;
        entry.duration_ns = entry.duration_ns.saturating_add(nanos);
        entry.request_bytes += report.request_bytes;
        entry.response_bytes += report.response_bytes;
        entry.histogram[slot] += 1;
    }

    /// Render every series in the Prometheus text exposition format.
    pub fn export_prometheus(&self) -> String {
        let series = self.series.lock().unwrap().clone();
        let mut out = String::new();

        counter(&mut out, "ent_requests_total", "Requests handled", &series, |s| s.requests);
        counter(
            &mut out,
            "ent_requests_duration_nanoseconds_total",
            "Time spent handling requests",
            &series,
            |s| s.duration_ns,
        );

        let name = "ent_requests_duration_nanoseconds";
        let _ = writeln!(out, "# HELP {name} Request handling time");
        let _ = writeln!(out, "# TYPE {name} histogram");
        for (labels, s) in &series {
            let mut cumulative = 0;
            for (i, count) in s.histogram.iter().enumerate() {
                cumulative += count;
                let le = match DURATION_BUCKETS_NS.get(i) {
                    Some(bound) => bound.to_string(),
                    None => "+Inf".to_string(),
                };
                out.push_str(name);
                out.push_str("_bucket");
                labels.render(&mut out, Some(&le));
                let _ = writeln!(out, " {cumulative}");
            }
            let _ = write!(out, "{name}_sum");
            labels.render(&mut out, None);
            let _ = writeln!(out, " {}", s.duration_ns);
            let _ = write!(out, "{name}_count");
            labels.render(&mut out, None);
            let _ = writeln!(out, " {}", s.requests);
        }

        counter(&mut out, "ent_request_bytes_total", "Body bytes received", &series, |s| {
            s.request_bytes
        });
        counter(&mut out, "ent_response_bytes_total", "Body bytes sent", &series, |s| {
            s.response_bytes
        });
        out
    }
}

fn counter(
    out: &mut String,
    name: &str,
    help: &str,
    series: &BTreeMap<Labels, Series>,
    value: impl Fn(&Series) -> u64,
) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    for (labels, s) in series {
        out.push_str(name);
        labels.render(out, None);
        let _ = writeln!(out, " {}", value(s));
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[async_trait]
impl RequestObserver for MetricsObserver {
    async fn on_request(&self, report: &RequestReport) {
        self.record(report);
    }
}
