//! Locale decision cascade.
//!
//! Priority, highest first:
//! 1. preference cookie (final, confidence 1.0)
//! 2. geo classification
//! 3. best supported Accept-Language entry, weighed against geo on conflict
//! 4. fallback locale with confidence 0
//!
//! On a geo/language conflict the language branch replaces the provenance
//! list with `[language-priority]` while the geo branch appends
//! `geo-priority`. That asymmetry is kept as-is; consumers of
//! `X-Redirect-Reason` depend on it.

use crate::config::EdgeConfig;
use crate::locale::bot::BotClassifier;
use crate::locale::cookie::CookieExtractor;
use crate::locale::geo::GeoClassifier;
use crate::locale::parse_accept_language;
use crate::locale::types::{
    BotClassification, DecisionResult, DecisionSource, EngineError, GeoSignal, HeaderPresence,
    SupportedLocales,
};

const COOKIE_CONFIDENCE: f64 = 1.0;
const LANGUAGE_ONLY_CAP: f64 = 0.8;
const GEO_CONFLICT_WEIGHT: f64 = 0.7;
const LANGUAGE_CONFLICT_WEIGHT: f64 = 0.5;

/// Stateless locale decision engine.
///
/// Built once from config and shared behind an `Arc`; every method takes
/// `&self` and performs no I/O.
#[derive(Debug, Clone)]
pub struct LocaleEngine {
    locales: SupportedLocales,
    cookie: CookieExtractor,
    geo: GeoClassifier,
    bots: BotClassifier,
}

impl LocaleEngine {
    /// Build the engine, validating locales, geo tables and bot patterns.
    pub fn from_config(config: &EdgeConfig) -> Result<Self, EngineError> {
        let locales = SupportedLocales::new(&config.locales.supported, &config.locales.fallback)?;
        let geo = GeoClassifier::new(&config.geo.tables, &locales)?;
        let bots = BotClassifier::new(&config.bots)?;

        Ok(Self {
            cookie: CookieExtractor::new(config.locales.cookie_name.clone()),
            locales,
            geo,
            bots,
        })
    }

    pub fn locales(&self) -> &SupportedLocales {
        &self.locales
    }

    /// Classify the request as automated or human.
    pub fn classify_bot(&self, user_agent: &str, headers: HeaderPresence) -> BotClassification {
        self.bots.classify(user_agent, headers)
    }

    /// Choose the locale to redirect to.
    ///
    /// Total: any combination of absent or malformed inputs yields a result,
    /// at worst the fallback locale with zero confidence. `_user_agent` is
    /// accepted for parity with the request surface; bot gating is done by
    /// [`classify_bot`](Self::classify_bot) before calling this.
    pub fn decide(
        &self,
        _user_agent: Option<&str>,
        accept_language: Option<&str>,
        cookie: Option<&str>,
        geo: &GeoSignal,
    ) -> DecisionResult {
        let mut result = DecisionResult {
            cookie: None,
            geo: None,
            language: None,
            final_locale: self.locales.fallback().clone(),
            confidence: 0.0,
            sources: Vec::new(),
        };

        if let Some(locale) = self.cookie.extract(cookie, &self.locales) {
            result.cookie = Some(locale.clone());
            result.final_locale = locale.clone();
            result.confidence = COOKIE_CONFIDENCE;
            result.sources.push(DecisionSource::Cookie);
            return result;
        }

        if let Some(hit) = self.geo.classify(geo) {
            result.final_locale = hit.locale.clone();
            result.confidence = hit.confidence;
            result.sources.push(hit.source.into());
            result.geo = Some(hit);
        }

        let top = parse_accept_language(accept_language.unwrap_or_default())
            .into_iter()
            .find_map(|pref| self.locales.get(&pref.locale).cloned().map(|l| (l, pref)));

        if let Some((locale, pref)) = top {
            match &result.geo {
                None => {
                    result.final_locale = locale;
                    result.confidence = pref.quality.min(LANGUAGE_ONLY_CAP);
                    result.sources = vec![DecisionSource::AcceptLanguage];
                }
                Some(geo) if geo.locale == locale => {}
                Some(geo) => match resolve_conflict(geo.confidence, pref.quality) {
                    ConflictWinner::Geo(weight) => {
                        result.confidence = weight;
                        result.sources.push(DecisionSource::GeoPriority);
                    }
                    ConflictWinner::Language(weight) => {
                        result.final_locale = locale;
                        result.confidence = weight;
                        result.sources = vec![DecisionSource::LanguagePriority];
                    }
                },
            }
            result.language = Some(pref);
        }

        result
    }
}

/// Outcome of a geo/language disagreement, with the winning weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConflictWinner {
    Geo(f64),
    Language(f64),
}

/// Weigh a geo classification against a disagreeing language preference.
///
/// Geo must be strictly heavier to win; a tie goes to the language.
pub fn resolve_conflict(geo_confidence: f64, quality: f64) -> ConflictWinner {
    let geo_weight = geo_confidence * GEO_CONFLICT_WEIGHT;
    let language_weight = quality * LANGUAGE_CONFLICT_WEIGHT;
    if geo_weight > language_weight {
        ConflictWinner::Geo(geo_weight)
    } else {
        ConflictWinner::Language(language_weight)
    }
}
