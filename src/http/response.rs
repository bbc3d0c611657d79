//! Redirect response construction.
//!
//! # Responsibilities
//! - Resolve `/{locale}` against the request's scheme and host
//! - Pick a cache lifetime from the decision confidence
//! - Echo the decision in diagnostic `X-*` headers
//!
//! # Design Decisions
//! - Query strings are not carried over to the localized URL
//! - Without a usable Host header the Location is path-only

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::config::RedirectConfig;
use crate::locale::{DecisionResult, GeoSignal, Locale};

/// Request details the redirect is built from, beyond the decision itself.
#[derive(Debug, Clone)]
pub struct RedirectContext<'a> {
    pub host: Option<&'a str>,
    pub scheme: &'a str,
    pub geo: &'a GeoSignal,
    pub geo_vary_header: &'a str,
    pub processing_time: Duration,
}

impl<'a> RedirectContext<'a> {
    /// Host and scheme as seen by the client, honouring `X-Forwarded-Proto`.
    pub fn from_headers(
        headers: &'a HeaderMap,
        geo: &'a GeoSignal,
        geo_vary_header: &'a str,
        processing_time: Duration,
    ) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty());
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .filter(|p| *p == "https" || *p == "http")
            .unwrap_or("http");

        Self {
            host,
            scheme,
            geo,
            geo_vary_header,
            processing_time,
        }
    }
}

/// `max-age` for a decision: long when confident, short otherwise.
pub fn cache_max_age(confidence: f64, config: &RedirectConfig) -> u64 {
    if confidence > config.high_confidence_threshold {
        config.high_confidence_max_age_secs
    } else {
        config.default_max_age_secs
    }
}

/// Absolute URL of the localized root, or the bare path if the host is unusable.
pub fn location_for(locale: &Locale, scheme: &str, host: Option<&str>) -> String {
    let path = format!("/{}", locale);
    host.and_then(|host| Url::parse(&format!("{}://{}/", scheme, host)).ok())
        .and_then(|base| base.join(&path).ok())
        .map(String::from)
        .unwrap_or(path)
}

/// Build the `302 Found` response for a decision.
pub fn redirect_response(decision: &DecisionResult, ctx: &RedirectContext<'_>, config: &RedirectConfig) -> Response {
    let location = location_for(&decision.final_locale, ctx.scheme, ctx.host);
    let max_age = cache_max_age(decision.confidence, config);
    let geo_data = format!(
        "{}-{}",
        ctx.geo.country.as_deref().unwrap_or("unknown"),
        ctx.geo.region.as_deref().unwrap_or("unknown"),
    );

    let headers = [
        ("location", location),
        ("vary", format!("Accept-Language, Cookie, {}", ctx.geo_vary_header)),
        ("cache-control", format!("public, max-age={}", max_age)),
        ("x-redirect-reason", decision.sources_header()),
        ("x-detected-locale", decision.final_locale.to_string()),
        ("x-confidence-score", format!("{:.2}", decision.confidence)),
        ("x-processing-time", format!("{}ms", ctx.processing_time.as_millis())),
        ("x-geo-data", geo_data),
    ];

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    for (name, value) in headers {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers_mut().insert(name, value);
            }
            Err(_) => {
                tracing::warn!(header = name, "Dropping header with non-visible characters");
            }
        }
    }
    response
}

/// Plain-text error response.
pub fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}
