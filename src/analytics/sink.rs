//! Download event sinks.
//!
//! `submit` is called on the request path and must return immediately. The
//! HTTP sink hands events to a bounded queue drained by a background task;
//! when the queue is full the event is dropped.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::analytics::tracker::DownloadEvent;
use crate::observability::metrics;

/// Destination for download events.
pub trait DownloadSink: Send + Sync {
    /// Hand off an event. Must not block or fail.
    fn submit(&self, event: DownloadEvent);
}

/// Discards events (downloads are still counted in metrics).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DownloadSink for NoopSink {
    fn submit(&self, _event: DownloadEvent) {}
}

/// Keeps events in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DownloadEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<DownloadEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DownloadSink for MemorySink {
    fn submit(&self, event: DownloadEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Wire format posted to the analytics collector.
#[derive(Debug, Serialize)]
struct DownloadPayload<'a> {
    key: String,
    #[serde(flatten)]
    event: &'a DownloadEvent,
}

/// Posts events as JSON to a collector URL from a background task.
#[derive(Debug, Clone)]
pub struct HttpSink {
    tx: mpsc::Sender<DownloadEvent>,
}

impl HttpSink {
    /// Start the delivery task. It exits once every `HttpSink` clone is dropped
    /// and the queue has drained.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(url: Url, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(deliver(url, rx));
        (Self { tx }, handle)
    }
}

impl DownloadSink for HttpSink {
    fn submit(&self, event: DownloadEvent) {
        if let Err(err) = self.tx.try_send(event) {
            metrics::record_analytics_dropped();
            match err {
                mpsc::error::TrySendError::Full(event) => {
                    tracing::debug!(package = %event.key(), "Analytics queue full, dropping event");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!("Analytics worker stopped, dropping event");
                }
            }
        }
    }
}

async fn deliver(url: Url, mut rx: mpsc::Receiver<DownloadEvent>) {
    let client = reqwest::Client::new();
    tracing::info!(url = %url, "Analytics sink started");

    while let Some(event) = rx.recv().await {
        let payload = DownloadPayload {
            key: event.key(),
            event: &event,
        };
        match client.post(url.clone()).json(&payload).send().await {
            Ok(res) if res.status().is_success() => {}
            Ok(res) => {
                metrics::record_analytics_dropped();
                tracing::warn!(status = %res.status(), "Analytics collector rejected event");
            }
            Err(e) => {
                metrics::record_analytics_dropped();
                tracing::warn!(error = %e, "Analytics delivery failed");
            }
        }
    }

    tracing::info!("Analytics sink stopped");
}

/// Build the sink described by the analytics config.
pub fn sink_from_config(
    config: &crate::config::AnalyticsConfig,
) -> Result<(Arc<dyn DownloadSink>, Option<JoinHandle<()>>), crate::config::ConfigError> {
    match &config.url {
        Some(raw) => {
            let url = Url::parse(raw).map_err(|source| crate::config::ConfigError::Url {
                field: "analytics.url".to_string(),
                source,
            })?;
            let (sink, handle) = HttpSink::spawn(url, config.queue_capacity);
            Ok((Arc::new(sink), Some(handle)))
        }
        None => Ok((Arc::new(NoopSink), None)),
    }
}
