use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::api::WebhookPayload;
use jobwatch_core::error::SinkError;
use jobwatch_core::model::{Severity, Transition};
use reqwest::Client;

/// A ready-to-display notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub job_name: String,
    pub message: String,
    pub severity: Severity,
}

impl From<&Transition> for Notification {
    fn from(t: &Transition) -> Self {
        Self {
            job_name: t.job_name.clone(),
            message: t.message(),
            severity: t.severity(),
        }
    }
}

/// Live alert destination. Called sequentially from the poll cycle.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, n: &Notification) -> Result<(), SinkError>;
}

/// Emits notifications as log events, level chosen by severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, n: &Notification) -> Result<(), SinkError> {
        match n.severity {
            Severity::Error => tracing::error!(job = %n.job_name, "{}", n.message),
            Severity::Warning => tracing::warn!(job = %n.job_name, "{}", n.message),
            Severity::Info => tracing::info!(job = %n.job_name, "{}", n.message),
        }
        Ok(())
    }
}

/// POSTs a JSON [`WebhookPayload`] to a URL (chat webhook, relay, etc.).
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: Client,
    url: String,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, n: &Notification) -> Result<(), SinkError> {
        let body = WebhookPayload {
            job: n.job_name.clone(),
            message: n.message.clone(),
            severity: n.severity,
        };
        let resp = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::new(self.name(), e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SinkError::new(self.name(), format!("webhook returned {}", resp.status())));
        }
        Ok(())
    }
}

/// Delivers to every inner sink; fails if any of them failed.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn deliver(&self, n: &Notification) -> Result<(), SinkError> {
        let mut failed = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(n).await {
                failed.push(e.to_string());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(SinkError::new(self.name(), failed.join("; ")))
        }
    }
}

/// In-memory sink for tests and embedding. Can be switched to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn deliver(&self, n: &Notification) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::new(self.name(), "configured to fail"));
        }
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(n.clone());
        Ok(())
    }
}
