//! Detached analytics recording.
//!
//! Handlers hand events to [`AnalyticsRecorder::record`], which never waits:
//! a full or closed queue drops the event. A single background task drains
//! the queue into an [`AnalyticsSink`].

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::analytics::event::{event_key, AnalyticsEvent};
use crate::analytics::store::AnalyticsSink;
use crate::observability::metrics;

/// Cheap, cloneable handle used on the request path.
#[derive(Clone, Debug)]
pub struct AnalyticsRecorder {
    tx: Option<mpsc::Sender<AnalyticsEvent>>,
}

impl AnalyticsRecorder {
    /// Create a recorder and the receiving end for its worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AnalyticsEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A recorder that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Submit an event without waiting. Returns whether it was queued.
    pub fn record(&self, event: AnalyticsEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                metrics::record_analytics_dropped();
                tracing::warn!(kind = event.kind(), "Analytics queue full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                metrics::record_analytics_dropped();
                tracing::warn!(kind = event.kind(), "Analytics recorder stopped, dropping event");
                false
            }
        }
    }
}

/// Background task that moves queued events into a sink.
pub struct AnalyticsWorker {
    rx: mpsc::Receiver<AnalyticsEvent>,
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsWorker {
    pub fn new(rx: mpsc::Receiver<AnalyticsEvent>, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { rx, sink }
    }

    /// Drain events until every sender is gone or shutdown fires, then flush.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Analytics recorder starting");

        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.store(event),
                    None => break,
                },
                _ = shutdown.recv() => {
                    self.rx.close();
                    while let Some(event) = self.rx.recv().await {
                        self.store(event);
                    }
                    break;
                }
            }
        }

        if let Err(e) = self.sink.flush() {
            tracing::warn!(error = %e, "Failed to flush analytics");
        }
        tracing::info!("Analytics recorder stopped");
    }

    fn store(&self, event: AnalyticsEvent) {
        let kind = event.kind();
        let key = event_key(event.timestamp_ms());
        match self.sink.put(key, event) {
            Ok(()) => metrics::record_analytics_event(kind),
            Err(e) => {
                metrics::record_analytics_dropped();
                tracing::warn!(kind, error = %e, "Analytics write failed");
            }
        }
    }
}
