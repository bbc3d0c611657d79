//! Retention-bounded analytics storage and persistence.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::analytics::event::{now_ms, AnalyticsEvent};
use crate::observability::metrics;

/// Errors from writing or persisting analytics.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for recorded events.
///
/// Called from the recorder task only, never from the request path.
pub trait AnalyticsSink: Send + Sync {
    fn put(&self, key: String, event: AnalyticsEvent) -> Result<(), AnalyticsError>;

    /// Persist buffered state. Called once when the recorder stops.
    fn flush(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

/// An event plus its eviction deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event: AnalyticsEvent,
    pub expires_at_ms: u64,
}

/// Aggregates exposed by the admin API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_events: usize,
    pub locale_redirects: usize,
    pub bot_requests: usize,
    pub redirects_by_locale: BTreeMap<String, usize>,
    pub redirects_by_source: BTreeMap<String, usize>,
    pub bots_by_reason: BTreeMap<String, usize>,
    pub average_redirect_confidence: f64,
}

/// A thread-safe, in-memory event store with a retention window.
#[derive(Clone)]
pub struct AnalyticsStore {
    inner: Arc<DashMap<String, StoredEvent>>,
    retention: Duration,
    persistence_path: Option<PathBuf>,
}

impl AnalyticsStore {
    /// Create a new empty store.
    pub fn new(retention: Duration, persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            retention,
            persistence_path,
        }
    }

    /// Load from file if it exists, dropping events already past retention.
    pub fn load_from_file(path: &Path, retention: Duration) -> Result<Self, AnalyticsError> {
        let store = Self::new(retention, Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<String, StoredEvent> = serde_json::from_reader(reader)?;

            let now = now_ms();
            for (key, stored) in map {
                if stored.expires_at_ms > now {
                    store.inner.insert(key, stored);
                }
            }
            metrics::record_store_size(store.inner.len());
            tracing::info!(events = store.inner.len(), path = ?path, "Loaded analytics from file");
        }
        Ok(store)
    }

    /// Save to file, if a persistence path is configured.
    pub fn save_to_file(&self) -> Result<(), AnalyticsError> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            let map: HashMap<String, StoredEvent> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            serde_json::to_writer(writer, &map)?;
            tracing::info!(events = map.len(), path = ?path, "Saved analytics to file");
        }
        Ok(())
    }

    /// Store an event under `key`; it expires `retention` after its timestamp.
    pub fn insert(&self, key: String, event: AnalyticsEvent) {
        let expires_at_ms = event
            .timestamp_ms()
            .saturating_add(self.retention.as_millis() as u64);
        self.inner.insert(key, StoredEvent { event, expires_at_ms });
        metrics::record_store_size(self.inner.len());
    }

    pub fn get(&self, key: &str) -> Option<StoredEvent> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every event whose deadline is at or before `now_ms`.
    pub fn purge_expired(&self, now_ms: u64) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, stored| stored.expires_at_ms > now_ms);
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_store_size(self.inner.len());
        removed
    }

    /// Periodically purge expired events until shutdown.
    pub async fn run_purge(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired(now_ms());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Purged expired analytics events");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Analytics purge task received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Aggregate the retained events.
    pub fn summary(&self) -> AnalyticsSummary {
        let mut summary = AnalyticsSummary::default();
        let mut confidence_total = 0.0;

        for r in self.inner.iter() {
            summary.total_events += 1;
            match &r.value().event {
                AnalyticsEvent::LocaleRedirect(e) => {
                    summary.locale_redirects += 1;
                    confidence_total += e.confidence;
                    *summary.redirects_by_locale.entry(e.target_locale.clone()).or_default() += 1;
                    let source = e.sources.first().cloned().unwrap_or_else(|| "fallback".to_string());
                    *summary.redirects_by_source.entry(source).or_default() += 1;
                }
                AnalyticsEvent::BotRequest(e) => {
                    summary.bot_requests += 1;
                    *summary.bots_by_reason.entry(e.reason.as_str().to_string()).or_default() += 1;
                }
            }
        }

        if summary.locale_redirects > 0 {
            summary.average_redirect_confidence = confidence_total / summary.locale_redirects as f64;
        }
        summary
    }
}

impl AnalyticsSink for AnalyticsStore {
    fn put(&self, key: String, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.insert(key, event);
        Ok(())
    }

    fn flush(&self) -> Result<(), AnalyticsError> {
        self.save_to_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::event::{BotRequestEvent, LocaleRedirectEvent};
    use crate::locale::BotReason;

    fn redirect(locale: &str, confidence: f64, sources: &[&str], timestamp_ms: u64) -> AnalyticsEvent {
        AnalyticsEvent::LocaleRedirect(LocaleRedirectEvent {
            target_locale: locale.to_string(),
            confidence,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            country: None,
            region: None,
            city: None,
            accept_language: None,
            user_agent: "test".to_string(),
            processing_time_ms: 0,
            timestamp_ms,
        })
    }

    fn bot(reason: BotReason, timestamp_ms: u64) -> AnalyticsEvent {
        AnalyticsEvent::BotRequest(BotRequestEvent {
            user_agent: String::new(),
            country: None,
            confidence: 1.0,
            reason,
            timestamp_ms,
        })
    }

    #[test]
    fn test_summary() {
        let store = AnalyticsStore::new(Duration::from_secs(60), None);
        let now = now_ms();
        store.insert("a".into(), redirect("de", 0.95, &["country"], now));
        store.insert("b".into(), redirect("en", 0.8, &["accept-language"], now));
        store.insert("c".into(), redirect("en", 0.0, &[], now));
        store.insert("d".into(), bot(BotReason::DefinitiveBot, now));

        let summary = store.summary();
        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.locale_redirects, 3);
        assert_eq!(summary.bot_requests, 1);
        assert_eq!(summary.redirects_by_locale["en"], 2);
        assert_eq!(summary.redirects_by_source["fallback"], 1);
        assert_eq!(summary.bots_by_reason["definitive-bot"], 1);
        assert!((summary.average_redirect_confidence - 0.583333).abs() < 1e-5);
    }

    #[test]
    fn test_retention_purge() {
        let store = AnalyticsStore::new(Duration::from_secs(10), None);
        store.insert("old".into(), redirect("de", 0.9, &["region"], 1_000));
        store.insert("new".into(), redirect("de", 0.9, &["region"], 100_000));

        assert_eq!(store.get("old").unwrap().expires_at_ms, 11_000);
        assert_eq!(store.purge_expired(50_000), 1);
        assert!(store.get("old").is_none());
        assert!(store.get("new").is_some());
        assert_eq!(store.purge_expired(110_000), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");
        let retention = Duration::from_secs(3600);

        let store = AnalyticsStore::new(retention, Some(path.clone()));
        store.insert("fresh".into(), redirect("de", 0.95, &["country"], now_ms()));
        store.insert("stale".into(), bot(BotReason::NoUserAgent, 1));
        store.flush().unwrap();

        let loaded = AnalyticsStore::load_from_file(&path, retention).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("fresh").is_some());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalyticsStore::load_from_file(&dir.path().join("none.json"), Duration::from_secs(1)).unwrap();
        assert!(store.is_empty());
    }
}
