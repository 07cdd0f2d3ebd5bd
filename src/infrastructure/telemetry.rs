//! Best-effort telemetry emission to an external collector.
//!
//! Request handlers queue events through a [`TelemetryHandle`]; queueing
//! uses `try_send` and never waits. A single [`TelemetryEmitter`] task
//! drains the channel and POSTs each event as JSON with its own request
//! timeout. Delivery failures are logged and the event is dropped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::shared::shutdown::ShutdownSignal;

/// Queue depth before events are dropped
const CHANNEL_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry channel full, event dropped")]
    ChannelFull,

    #[error("telemetry emitter stopped")]
    Closed,

    #[error("network error: {0}")]
    Network(String),

    #[error("collector error: HTTP {0}")]
    Server(u16),
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// Collector URL events are POSTed to
    pub endpoint: String,
    pub timeout: Duration,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            timeout: Duration::from_secs(5),
            service_name: "opmetrics".to_string(),
        }
    }
}

/// One observability event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub properties: serde_json::Value,
}

impl TelemetryEvent {
    pub fn metric_ingested(project_id: &str, operation: &str, duration: f64) -> Self {
        Self {
            event: "metric_ingested".to_string(),
            timestamp: Utc::now(),
            properties: serde_json::json!({
                "projectId": project_id,
                "operation": operation,
                "duration": duration,
            }),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    service: &'a str,
    #[serde(flatten)]
    event: &'a TelemetryEvent,
}

/// Cheap to clone. A disabled handle accepts and discards everything.
#[derive(Clone)]
pub struct TelemetryHandle {
    tx: Option<mpsc::Sender<TelemetryEvent>>,
}

impl TelemetryHandle {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an event without waiting.
    pub fn try_emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TelemetryError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => TelemetryError::Closed,
        })
    }

    /// Queue an event, logging instead of failing.
    pub fn emit(&self, event: TelemetryEvent) {
        if let Err(e) = self.try_emit(event) {
            debug!(error = %e, "Telemetry event dropped");
        }
    }
}

pub struct TelemetryEmitter {
    config: TelemetryConfig,
    rx: mpsc::Receiver<TelemetryEvent>,
    http_client: reqwest::Client,
}

impl TelemetryEmitter {
    /// Create the emitter and its handle. Returns no emitter when telemetry
    /// is disabled; the handle is then a no-op.
    pub fn new(config: TelemetryConfig) -> (Option<Self>, TelemetryHandle) {
        if !config.enabled || config.endpoint.is_empty() {
            return (None, TelemetryHandle::disabled());
        }

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        let emitter = Self {
            config,
            rx,
            http_client,
        };
        (Some(emitter), TelemetryHandle { tx: Some(tx) })
    }

    /// Drain events until shutdown or until every handle is dropped.
    pub async fn run(mut self, shutdown: ShutdownSignal) {
        info!(endpoint = %self.config.endpoint, "Telemetry emitter started");

        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.deliver(&event).await,
                    None => break,
                },
                _ = shutdown.wait() => break,
            }
        }

        debug!("Telemetry emitter stopped");
    }

    async fn deliver(&self, event: &TelemetryEvent) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, event = %event.event, "Failed to deliver telemetry event");
        }
    }

    async fn send(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        let envelope = Envelope {
            service: &self.config.service_name,
            event,
        };

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| TelemetryError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TelemetryError::Server(response.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    fn config(endpoint: String) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            endpoint,
            timeout: Duration::from_secs(2),
            service_name: "opmetrics-test".to_string(),
        }
    }

    #[test]
    fn disabled_handle_accepts_everything() {
        let (emitter, handle) = TelemetryEmitter::new(TelemetryConfig::default());
        assert!(emitter.is_none());
        assert!(handle
            .try_emit(TelemetryEvent::metric_ingested("p", "op", 1.0))
            .is_ok());
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let (_emitter, handle) = TelemetryEmitter::new(config("http://127.0.0.1:9".into()));
        for _ in 0..CHANNEL_BUFFER {
            handle
                .try_emit(TelemetryEvent::metric_ingested("p", "op", 1.0))
                .unwrap();
        }
        let overflow = handle.try_emit(TelemetryEvent::metric_ingested("p", "op", 1.0));
        assert!(matches!(overflow, Err(TelemetryError::ChannelFull)));
        // emit() swallows the same failure
        handle.emit(TelemetryEvent::metric_ingested("p", "op", 1.0));
    }

    #[tokio::test]
    async fn delivers_events_to_collector() {
        let (seen_tx, mut seen_rx) = mpsc::channel::<serde_json::Value>(1);
        let app = Router::new().route(
            "/events",
            post(move |Json(body): Json<serde_json::Value>| {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(body).await;
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let (emitter, handle) = TelemetryEmitter::new(config(format!("http://{}/events", addr)));
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(emitter.unwrap().run(shutdown.clone()));

        handle.emit(TelemetryEvent::metric_ingested("p-1", "checkout", 12.5));

        let body = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["service"], "opmetrics-test");
        assert_eq!(body["event"], "metric_ingested");
        assert_eq!(body["properties"]["operation"], "checkout");

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn unreachable_collector_is_not_fatal() {
        let (emitter, handle) = TelemetryEmitter::new(config("http://127.0.0.1:9/none".into()));
        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(emitter.unwrap().run(shutdown.clone()));

        handle.emit(TelemetryEvent::metric_ingested("p", "op", 1.0));
        drop(handle);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn stalled_collector_is_cut_off_by_timeout() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Instant;

        // First request hangs forever, later ones are answered
        let hits = Arc::new(AtomicUsize::new(0));
        let (seen_tx, mut seen_rx) = mpsc::channel::<serde_json::Value>(1);
        let app = Router::new().route(
            "/events",
            post(move |Json(body): Json<serde_json::Value>| {
                let hits = hits.clone();
                let seen_tx = seen_tx.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        std::future::pending::<()>().await;
                    }
                    let _ = seen_tx.send(body).await;
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let mut cfg = config(format!("http://{}/events", addr));
        cfg.timeout = Duration::from_millis(300);
        let (emitter, _handle) = TelemetryEmitter::new(cfg);
        let emitter = emitter.unwrap();

        let started = Instant::now();
        emitter
            .deliver(&TelemetryEvent::metric_ingested("p", "stalled", 1.0))
            .await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);

        emitter
            .deliver(&TelemetryEvent::metric_ingested("p", "after", 2.0))
            .await;
        let body = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["properties"]["operation"], "after");
    }
}
