use anyhow::{Context, Result};
use hyper::StatusCode;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const SOURCE: &str = "HttpClient";

pub const SUCCESS_REQUESTS: &str = "httpclient/success_requests";
pub const RUN_TIME: &str = "httpclient/run_time";
pub const REQUESTS_PER_SECOND: &str = "httpclient/requests_per_seconds";
pub const TOTAL_REQUESTS: &str = "httpclient/total_requests";

/// Reported instead of a throughput when nothing completed.
pub const NO_THROUGHPUT: f64 = -1.0;

const START_MARKER: &str = "#StartJobStatistics";
const END_MARKER: &str = "#EndJobStatistics";

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RunCounts {
    pub success: u64,
    pub total: u64,
}

impl RunCounts {
    #[inline]
    pub fn record(&mut self, status: StatusCode) {
        self.total += 1;
        if status.is_success() {
            self.success += 1;
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct RunResult {
    pub counts: RunCounts,
    pub elapsed: Duration,
}

impl RunResult {
    #[inline]
    #[must_use]
    pub fn requests_per_second(&self) -> f64 {
        requests_per_second(self.counts.total, self.elapsed)
    }
}

/// Total requests over elapsed seconds, [`NO_THROUGHPUT`] if either is zero.
#[must_use]
pub fn requests_per_second(total: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if total == 0 || secs == 0.0 {
        return NO_THROUGHPUT;
    }
    total as f64 / secs
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum MetricFormat {
    /// Integer with thousands separators.
    #[serde(rename = "n0")]
    N0,
    /// One decimal.
    #[serde(rename = "f1")]
    F1,
}

impl MetricFormat {
    #[must_use]
    pub fn render(self, value: f64) -> String {
        match self {
            MetricFormat::N0 => group_thousands(value.round() as i64),
            MetricFormat::F1 => format!("{value:.1}"),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Max,
    Sum,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricMetadata {
    pub source: &'static str,
    pub name: &'static str,
    pub aggregate: Operation,
    pub reduce: Operation,
    pub short_description: &'static str,
    pub long_description: &'static str,
    pub format: MetricFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(u64),
    Float(f64),
}

impl MetricValue {
    #[inline]
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Integer(v) => v as f64,
            MetricValue::Float(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurement {
    pub timestamp: u64,
    pub name: &'static str,
    pub value: MetricValue,
}

/// Metric metadata and measurements of one process, printed as a JSON
/// document between marker lines for a benchmark controller to scrape.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobStatistics {
    metadata: Vec<MetricMetadata>,
    measurements: Vec<Measurement>,
}

impl JobStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: MetricMetadata) {
        self.metadata.retain(|m| m.name != metadata.name);
        self.metadata.push(metadata);
    }

    #[must_use]
    pub fn metadata(&self) -> &[MetricMetadata] {
        &self.metadata
    }

    #[must_use]
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Human readable line for a value, labelled by the metric's metadata.
    #[must_use]
    pub fn console_line(&self, name: &str, value: MetricValue) -> String {
        match self.metadata.iter().find(|m| m.name == name) {
            Some(meta) => format!(
                "{} {}",
                meta.long_description,
                meta.format.render(value.as_f64())
            ),
            None => format!("{name} {}", value.as_f64()),
        }
    }

    pub fn measure(&mut self, name: &'static str, value: MetricValue) {
        println!("{}", self.console_line(name, value));
        self.measurements.push(Measurement {
            timestamp: unix_millis(),
            name,
            value,
        });
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize job statistics")
    }

    pub fn report(&self) -> Result<()> {
        let json = self.to_json()?;
        println!("{START_MARKER}\n{json}\n{END_MARKER}");
        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn http_client_metric(
    name: &'static str,
    short_description: &'static str,
    long_description: &'static str,
    format: MetricFormat,
) -> MetricMetadata {
    MetricMetadata {
        source: SOURCE,
        name,
        aggregate: Operation::Max,
        reduce: Operation::Sum,
        short_description,
        long_description,
        format,
    }
}

/// Registers the four client metrics. Done once at startup.
pub fn register_metadata(stats: &mut JobStatistics) {
    stats.register(http_client_metric(
        SUCCESS_REQUESTS,
        "Requests",
        "Total number of successful requests",
        MetricFormat::N0,
    ));
    stats.register(http_client_metric(
        RUN_TIME,
        "Time",
        "Duration of run (ms)",
        MetricFormat::N0,
    ));
    stats.register(http_client_metric(
        REQUESTS_PER_SECOND,
        "RPS",
        "RPS",
        MetricFormat::F1,
    ));
    stats.register(http_client_metric(
        TOTAL_REQUESTS,
        "Requests",
        "Total number of requests",
        MetricFormat::N0,
    ));
}

pub fn record_run(stats: &mut JobStatistics, result: &RunResult) {
    let elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX);
    stats.measure(RUN_TIME, MetricValue::Integer(elapsed_ms));
    stats.measure(
        REQUESTS_PER_SECOND,
        MetricValue::Float(result.requests_per_second()),
    );
    stats.measure(TOTAL_REQUESTS, MetricValue::Integer(result.counts.total));
    stats.measure(SUCCESS_REQUESTS, MetricValue::Integer(result.counts.success));
}
