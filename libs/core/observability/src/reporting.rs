//! Error reporting sink.
//!
//! System faults (broker unreachable, publish failures, fatal startup errors)
//! are handed to an [`ErrorReporter`]. Client mistakes such as unknown event
//! types or malformed bodies are never reported here.
//!
//! Reporting must never block or fail the request that produced the report:
//! [`ErrorReporter::report`] is synchronous and infallible, and the webhook
//! implementation ships the report from a spawned task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, warn};

/// Severity of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    Fatal,
}

impl ReportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLevel::Error => "error",
            ReportLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fault handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub level: ReportLevel,
    pub timestamp: DateTime<Utc>,
    /// Free-form context such as `stage`, `event_type` or `backend`
    pub tags: BTreeMap<String, String>,
}

impl ErrorReport {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ReportLevel::Error)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(message, ReportLevel::Fatal)
    }

    fn new(message: impl Into<String>, level: ReportLevel) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Utc::now(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Destination for system faults
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: ErrorReport);

    /// Short label for logs, e.g. `webhook`
    fn kind(&self) -> &'static str;

    /// Wait up to `timeout` for reports still in delivery.
    ///
    /// Called before the process exits after a fatal error.
    async fn flush(&self, timeout: Duration) {
        let _ = timeout;
    }
}

/// Reporter that only writes reports to the log
#[derive(Debug, Clone)]
pub struct TracingReporter {
    service: String,
    environment: String,
}

impl TracingReporter {
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            environment: environment.into(),
        }
    }
}

#[async_trait]
impl ErrorReporter for TracingReporter {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn report(&self, report: ErrorReport) {
        error!(
            service = %self.service,
            environment = %self.environment,
            level = %report.level,
            tags = ?report.tags,
            "{}",
            report.message
        );
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    service: &'a str,
    environment: &'a str,
    #[serde(flatten)]
    report: &'a ErrorReport,
}

/// Delivery limits for [`WebhookReporter`]
#[derive(Debug, Clone, Copy)]
pub struct WebhookOptions {
    /// Upper bound for one POST, connect included
    pub timeout: Duration,
    /// Reports still in delivery beyond this count are dropped
    pub max_in_flight: usize,
}

impl Default for WebhookOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_in_flight: 64,
        }
    }
}

/// Reporter that POSTs each report as JSON to an HTTP endpoint.
///
/// Reports are also logged. Delivery failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    client: reqwest::Client,
    endpoint: String,
    service: String,
    environment: String,
    max_in_flight: usize,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl WebhookReporter {
    pub fn new(
        endpoint: impl Into<String>,
        service: impl Into<String>,
        environment: impl Into<String>,
    ) -> reqwest::Result<Self> {
        Self::with_options(endpoint, service, environment, WebhookOptions::default())
    }

    pub fn with_options(
        endpoint: impl Into<String>,
        service: impl Into<String>,
        environment: impl Into<String>,
        options: WebhookOptions,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            service: service.into(),
            environment: environment.into(),
            max_in_flight: options.max_in_flight,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deliveries spawned and not yet reaped
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or_default()
    }

    fn payload(&self, report: &ErrorReport) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&WebhookPayload {
            service: &self.service,
            environment: &self.environment,
            report,
        })
    }
}

#[async_trait]
impl ErrorReporter for WebhookReporter {
    fn kind(&self) -> &'static str {
        "webhook"
    }

    fn report(&self, report: ErrorReport) {
        error!(
            service = %self.service,
            level = %report.level,
            tags = ?report.tags,
            "{}",
            report.message
        );

        let body = match self.payload(&report) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to serialize error report");
                return;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, error report not delivered");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let delivery = async move {
            let result = client
                .post(&endpoint)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            if let Err(e) = result {
                warn!(endpoint = %endpoint, error = %e, "Failed to deliver error report");
            }
        };

        if let Ok(mut in_flight) = self.in_flight.lock() {
            while in_flight.try_join_next().is_some() {}
            if in_flight.len() >= self.max_in_flight {
                warn!(
                    in_flight = in_flight.len(),
                    "Too many error reports in delivery, dropping this one"
                );
                return;
            }
            in_flight.spawn_on(delivery, &handle);
        }
    }

    async fn flush(&self, timeout: Duration) {
        let mut pending = match self.in_flight.lock() {
            Ok(mut in_flight) => std::mem::take(&mut *in_flight),
            Err(_) => return,
        };

        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = pending.len(),
                "Gave up waiting for error report delivery"
            );
        }
    }
}

/// Reporter that keeps reports in memory, for tests
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<ErrorReport>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn report(&self, report: ErrorReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}
