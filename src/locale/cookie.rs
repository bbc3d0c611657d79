//! Stored locale preference from the Cookie header.

use std::collections::HashMap;

use crate::locale::types::{Locale, SupportedLocales};

/// Reads the preference cookie and validates it against the supported set.
#[derive(Debug, Clone)]
pub struct CookieExtractor {
    name: String,
}

impl CookieExtractor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the stored locale if the cookie is present and supported.
    pub fn extract<'a>(&self, header: Option<&str>, locales: &'a SupportedLocales) -> Option<&'a Locale> {
        let header = header.filter(|h| !h.is_empty())?;
        let cookies = parse_cookies(header);
        cookies
            .get(self.name.as_str())
            .and_then(|value| locales.get(value))
    }
}

/// Split a Cookie header into name/value pairs.
///
/// Values are percent-decoded. Pairs with an empty name or value, or a value
/// that does not decode, are skipped. Later duplicates overwrite earlier ones.
pub fn parse_cookies(header: &str) -> HashMap<&str, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name.is_empty() || value.is_empty() {
            continue;
        }
        match urlencoding::decode(value) {
            Ok(decoded) => {
                cookies.insert(name, decoded.into_owned());
            }
            Err(e) => {
                tracing::debug!(cookie = %name, error = %e, "Skipping undecodable cookie value");
            }
        }
    }
    cookies
}
