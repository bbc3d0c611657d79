//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! service. All types derive Serde traits for deserialization from config
//! files, and every section has defaults so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration for the locale edge service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// SPA origin that receives non-redirected traffic.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Supported locales, fallback and preference cookie.
    pub locales: LocalesConfig,

    /// Geo headers and lookup tables.
    pub geo: GeoConfig,

    /// Bot signature patterns.
    pub bots: BotConfig,

    /// Redirect response policy.
    pub redirect: RedirectConfig,

    /// Analytics recording.
    pub analytics: AnalyticsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent in-flight requests.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Origin serving the single-page application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Locale set and stored preference.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalesConfig {
    /// Locales the site is published in.
    pub supported: Vec<String>,

    /// Locale used when no signal applies. Must be in `supported`.
    pub fallback: String,

    /// Name of the cookie holding the user's explicit choice.
    pub cookie_name: String,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            supported: vec!["de".to_string(), "en".to_string()],
            fallback: "en".to_string(),
            cookie_name: "pm_lang".to_string(),
        }
    }
}

/// Where the geo annotation lives and how it maps to locales.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Request header carrying the ISO country code.
    pub country_header: String,

    /// Request header carrying the region code.
    pub region_header: String,

    /// Request header carrying the city name.
    pub city_header: String,

    /// Lookup tables, consulted in order within each tier.
    pub tables: Vec<GeoTableConfig>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            country_header: "cf-ipcountry".to_string(),
            region_header: "cf-region-code".to_string(),
            city_header: "cf-ipcity".to_string(),
            tables: vec![GeoTableConfig::german()],
        }
    }
}

/// Geo lookup table for one locale.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeoTableConfig {
    /// Locale this table votes for.
    pub locale: String,

    /// Countries where the locale is the majority language.
    #[serde(default)]
    pub countries: Vec<String>,

    /// Country → regions where the locale is spoken. `"*"` matches any region.
    #[serde(default)]
    pub regions: BTreeMap<String, Vec<String>>,

    /// Cities where the locale is the majority language.
    #[serde(default)]
    pub cities: Vec<String>,
}

impl GeoTableConfig {
    /// German-speaking countries, regions and major cities.
    pub fn german() -> Self {
        let regions = [
            ("IT", vec!["BZ", "TN", "AA"]), // South Tyrol, Trentino, Alto Adige
            ("BE", vec!["VLG"]),
            ("LU", vec!["*"]),
            ("LI", vec!["*"]),
        ]
        .into_iter()
        .map(|(country, regions)| {
            (
                country.to_string(),
                regions.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            locale: "de".to_string(),
            countries: strings(&["DE", "AT", "CH"]),
            regions,
            cities: strings(&[
                "Berlin", "Munich", "Vienna", "Zurich", "Geneva", "Bolzano", "Luxembourg", "Vaduz",
            ]),
        }
    }
}

/// Bot signature patterns (case-insensitive regular expressions).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Known crawlers and link-preview agents. Any match is a bot.
    pub definitive_patterns: Vec<String>,

    /// Generic automation hints. Each match adds to the suspicion score.
    pub suspicious_patterns: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            definitive_patterns: strings(&[
                "googlebot",
                "bingbot",
                "slurp",
                "duckduckbot",
                "baiduspider",
                "yandexbot",
                "facebookexternalhit",
                "twitterbot",
                "linkedinbot",
                "discordbot",
                "whatsapp",
                "telegrambot",
            ]),
            suspicious_patterns: strings(&[
                "bot",
                "crawler",
                "spider",
                "scraper",
                "curl",
                "wget",
                "python",
                "requests",
                "http",
                "fetch",
                "automation",
            ]),
        }
    }
}

/// Redirect response policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Bots above this confidence bypass the redirect and reach the origin.
    pub bot_confidence_gate: f64,

    /// Decisions above this confidence get the long cache lifetime.
    pub high_confidence_threshold: f64,

    /// `max-age` for high-confidence redirects, in seconds.
    pub high_confidence_max_age_secs: u64,

    /// `max-age` for all other redirects, in seconds.
    pub default_max_age_secs: u64,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            bot_confidence_gate: 0.8,
            high_confidence_threshold: 0.9,
            high_confidence_max_age_secs: 1800,
            default_max_age_secs: 300,
        }
    }
}

/// Analytics recording configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Enable analytics recording.
    pub enabled: bool,

    /// Queue depth between request handlers and the recorder task.
    pub channel_capacity: usize,

    /// How long events are kept, in seconds.
    pub retention_secs: u64,

    /// How often expired events are purged, in seconds.
    pub purge_interval_secs: u64,

    /// Optional JSON file the store is loaded from and saved to.
    pub persistence_path: Option<String>,

    /// User-agent strings are truncated to this many characters.
    pub user_agent_max_len: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 1024,
            retention_secs: 86_400 * 30, // 30 days
            purge_interval_secs: 3600,
            persistence_path: None,
            user_agent_max_len: 200,
        }
    }
}

impl AnalyticsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
