//! Analytics event types.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::locale::{BotClassification, BotReason, DecisionResult, GeoSignal};

/// Something worth counting that happened on the request path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnalyticsEvent {
    BotRequest(BotRequestEvent),
    LocaleRedirect(LocaleRedirectEvent),
}

impl AnalyticsEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsEvent::BotRequest(_) => "bot-request",
            AnalyticsEvent::LocaleRedirect(_) => "locale-redirect",
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            AnalyticsEvent::BotRequest(e) => e.timestamp_ms,
            AnalyticsEvent::LocaleRedirect(e) => e.timestamp_ms,
        }
    }
}

/// A bot that was let through to the origin without a redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRequestEvent {
    pub user_agent: String,
    pub country: Option<String>,
    pub confidence: f64,
    pub reason: BotReason,
    pub timestamp_ms: u64,
}

impl BotRequestEvent {
    pub fn new(user_agent: &str, geo: &GeoSignal, bot: &BotClassification, max_ua_len: usize) -> Self {
        Self {
            user_agent: truncate_chars(user_agent, max_ua_len),
            country: geo.country.clone(),
            confidence: bot.confidence,
            reason: bot.reason,
            timestamp_ms: now_ms(),
        }
    }
}

/// A redirect that was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleRedirectEvent {
    pub target_locale: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub accept_language: Option<String>,
    pub user_agent: String,
    pub processing_time_ms: u64,
    pub timestamp_ms: u64,
}

impl LocaleRedirectEvent {
    pub fn new(
        decision: &DecisionResult,
        geo: &GeoSignal,
        accept_language: Option<&str>,
        user_agent: &str,
        processing_time_ms: u64,
        max_ua_len: usize,
    ) -> Self {
        Self {
            target_locale: decision.final_locale.to_string(),
            confidence: decision.confidence,
            sources: decision.sources.iter().map(|s| s.as_str().to_string()).collect(),
            country: geo.country.clone(),
            region: geo.region.clone(),
            city: geo.city.clone(),
            accept_language: accept_language.map(str::to_string),
            user_agent: truncate_chars(user_agent, max_ua_len),
            processing_time_ms,
            timestamp_ms: now_ms(),
        }
    }
}

/// Storage key: `redirect-{unix_ms}-{9 random base36 chars}`.
pub fn event_key(timestamp_ms: u64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("redirect-{}-{}", timestamp_ms, suffix)
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
