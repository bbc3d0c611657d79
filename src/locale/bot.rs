//! Automated-agent detection.
//!
//! # Responsibilities
//! - Recognise known crawlers and link-preview agents outright
//! - Score everything else on user-agent patterns and missing browser headers
//!
//! # Design Decisions
//! - Weighted rule scorer with fixed weights; patterns come from config
//! - Patterns compile once into case-insensitive `RegexSet`s
//! - Score accumulates in a fixed order so results are reproducible bit-for-bit

use regex::{RegexSet, RegexSetBuilder};

use crate::config::BotConfig;
use crate::locale::types::{BotClassification, BotReason, EngineError, HeaderPresence};

const NO_USER_AGENT_CONFIDENCE: f64 = 0.9;
const SUSPICIOUS_PATTERN_WEIGHT: f64 = 0.3;
const MISSING_ACCEPT_WEIGHT: f64 = 0.4;
const MISSING_ACCEPT_LANGUAGE_WEIGHT: f64 = 0.3;
const MISSING_ACCEPT_ENCODING_WEIGHT: f64 = 0.2;
const SHORT_USER_AGENT_WEIGHT: f64 = 0.4;
const SHORT_USER_AGENT_LEN: usize = 20;
const BOT_THRESHOLD: f64 = 0.7;

/// Rule-based bot classifier.
#[derive(Debug, Clone)]
pub struct BotClassifier {
    definitive: RegexSet,
    suspicious: RegexSet,
}

impl BotClassifier {
    pub fn new(config: &BotConfig) -> Result<Self, EngineError> {
        Ok(Self {
            definitive: compile("definitive", &config.definitive_patterns)?,
            suspicious: compile("suspicious", &config.suspicious_patterns)?,
        })
    }

    /// Classify a request from its user-agent and header presence.
    pub fn classify(&self, user_agent: &str, headers: HeaderPresence) -> BotClassification {
        if user_agent.is_empty() {
            return BotClassification {
                is_bot: true,
                confidence: NO_USER_AGENT_CONFIDENCE,
                reason: BotReason::NoUserAgent,
            };
        }

        if self.definitive.is_match(user_agent) {
            return BotClassification {
                is_bot: true,
                confidence: 1.0,
                reason: BotReason::DefinitiveBot,
            };
        }

        let mut score = 0.0;
        for _ in self.suspicious.matches(user_agent).iter() {
            score += SUSPICIOUS_PATTERN_WEIGHT;
        }
        if !headers.accept {
            score += MISSING_ACCEPT_WEIGHT;
        }
        if !headers.accept_language {
            score += MISSING_ACCEPT_LANGUAGE_WEIGHT;
        }
        if !headers.accept_encoding {
            score += MISSING_ACCEPT_ENCODING_WEIGHT;
        }
        if user_agent.chars().count() < SHORT_USER_AGENT_LEN {
            score += SHORT_USER_AGENT_WEIGHT;
        }

        let is_bot = score >= BOT_THRESHOLD;
        BotClassification {
            is_bot,
            confidence: score.min(1.0),
            reason: if is_bot {
                BotReason::SuspiciousPatterns
            } else {
                BotReason::LikelyHuman
            },
        }
    }
}

fn compile(kind: &'static str, patterns: &[String]) -> Result<RegexSet, EngineError> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|source| EngineError::Pattern { kind, source })
}
