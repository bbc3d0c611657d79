//! Locale detection types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A locale code that has been checked against the supported set.
///
/// Only [`SupportedLocales`] hands these out, so holding a `Locale` means the
/// code is servable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Locale {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Locale {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The closed set of locales the site is published in, plus the fallback.
#[derive(Debug, Clone)]
pub struct SupportedLocales {
    locales: Vec<Locale>,
    fallback: Locale,
}

impl SupportedLocales {
    /// Build the set. The fallback must be one of `codes`.
    pub fn new<S: AsRef<str>>(codes: &[S], fallback: &str) -> Result<Self, EngineError> {
        let mut locales: Vec<Locale> = Vec::with_capacity(codes.len());
        for code in codes {
            let code = code.as_ref();
            if code.is_empty() {
                return Err(EngineError::EmptyLocale);
            }
            if !locales.iter().any(|l| l.0 == code) {
                locales.push(Locale(code.to_string()));
            }
        }

        let fallback = locales
            .iter()
            .find(|l| l.0 == fallback)
            .cloned()
            .ok_or_else(|| EngineError::UnsupportedLocale(fallback.to_string()))?;

        Ok(Self { locales, fallback })
    }

    /// Look up a code; `None` if it is not in the set.
    pub fn get(&self, code: &str) -> Option<&Locale> {
        self.locales.iter().find(|l| l.0 == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn fallback(&self) -> &Locale {
        &self.fallback
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        self.locales.iter()
    }
}

/// One entry of a parsed Accept-Language header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguagePreference {
    /// Primary subtag, lowercased. Not yet checked against the supported set.
    pub locale: String,
    /// Quality value in `(0, 1]`.
    pub quality: f64,
}

/// Geographic annotation supplied by the edge platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoSignal {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl GeoSignal {
    pub fn new(country: Option<&str>, region: Option<&str>, city: Option<&str>) -> Self {
        Self {
            country: country.map(str::to_string),
            region: region.map(str::to_string),
            city: city.map(str::to_string),
        }
    }

    /// Country only, the common case for platforms that annotate just that.
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            ..Self::default()
        }
    }
}

/// Which geo tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoSource {
    Country,
    Region,
    City,
}

impl GeoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoSource::Country => "country",
            GeoSource::Region => "region",
            GeoSource::City => "city",
        }
    }
}

/// Result of the geo classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoClassification {
    pub locale: Locale,
    pub confidence: f64,
    pub source: GeoSource,
}

/// Why the bot classifier reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BotReason {
    NoUserAgent,
    DefinitiveBot,
    SuspiciousPatterns,
    LikelyHuman,
}

impl BotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotReason::NoUserAgent => "no-user-agent",
            BotReason::DefinitiveBot => "definitive-bot",
            BotReason::SuspiciousPatterns => "suspicious-patterns",
            BotReason::LikelyHuman => "likely-human",
        }
    }
}

impl fmt::Display for BotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the bot classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BotClassification {
    pub is_bot: bool,
    pub confidence: f64,
    pub reason: BotReason,
}

/// Which typical browser headers were present on the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderPresence {
    pub accept: bool,
    pub accept_language: bool,
    pub accept_encoding: bool,
}

impl HeaderPresence {
    /// All three headers present, as a regular browser sends them.
    pub fn browser() -> Self {
        Self {
            accept: true,
            accept_language: true,
            accept_encoding: true,
        }
    }
}

/// Provenance tag recorded on a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    Cookie,
    Country,
    Region,
    City,
    AcceptLanguage,
    GeoPriority,
    LanguagePriority,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::Cookie => "cookie",
            DecisionSource::Country => "country",
            DecisionSource::Region => "region",
            DecisionSource::City => "city",
            DecisionSource::AcceptLanguage => "accept-language",
            DecisionSource::GeoPriority => "geo-priority",
            DecisionSource::LanguagePriority => "language-priority",
        }
    }
}

impl From<GeoSource> for DecisionSource {
    fn from(source: GeoSource) -> Self {
        match source {
            GeoSource::Country => DecisionSource::Country,
            GeoSource::Region => DecisionSource::Region,
            GeoSource::City => DecisionSource::City,
        }
    }
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of [`LocaleEngine::decide`](crate::locale::LocaleEngine::decide).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    pub cookie: Option<Locale>,
    pub geo: Option<GeoClassification>,
    pub language: Option<LanguagePreference>,
    #[serde(rename = "final")]
    pub final_locale: Locale,
    pub confidence: f64,
    pub sources: Vec<DecisionSource>,
}

impl DecisionResult {
    /// Sources joined with commas, as sent in `X-Redirect-Reason`.
    pub fn sources_header(&self) -> String {
        self.sources
            .iter()
            .map(DecisionSource::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Errors raised while building the engine from configuration.
///
/// Decisions themselves never fail.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("locale code must not be empty")]
    EmptyLocale,

    #[error("locale '{0}' is not in the supported set")]
    UnsupportedLocale(String),

    #[error("invalid {kind} bot pattern: {source}")]
    Pattern {
        kind: &'static str,
        #[source]
        source: regex::Error,
    },
}
