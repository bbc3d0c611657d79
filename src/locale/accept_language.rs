//! Accept-Language header parsing.
//!
//! # Design Decisions
//! - Tags are reduced to their primary subtag (`de-AT` → `de`)
//! - Malformed entries are skipped, never reported
//! - Sorting is stable so equal-quality entries keep header order

use crate::locale::types::LanguagePreference;

/// Parse an Accept-Language header into preferences, best first.
///
/// Entries with `q <= 0`, an empty tag, or an unparsable quality are dropped.
/// Returns an empty vec for empty input.
pub fn parse_accept_language(header: &str) -> Vec<LanguagePreference> {
    let mut prefs: Vec<LanguagePreference> = header
        .split(',')
        .filter_map(parse_entry)
        .filter(|pref| pref.quality > 0.0)
        .collect();

    // Stable sort on the raw q; clamp only afterwards.
    prefs.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    for pref in &mut prefs {
        pref.quality = pref.quality.min(1.0);
    }
    prefs
}

fn parse_entry(entry: &str) -> Option<LanguagePreference> {
    let mut parts = entry.trim().split(';');
    let tag = parts.next()?.trim();

    let locale = tag
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if locale.is_empty() {
        return None;
    }

    let mut quality = 1.0;
    for param in parts {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("q=").or_else(|| param.strip_prefix("Q=")) {
            quality = value.trim().parse::<f64>().ok()?;
        }
    }

    if quality.is_nan() {
        return None;
    }

    Some(LanguagePreference { locale, quality })
}
