//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) unless the edge already set one
//! - Extract the locale-relevant signals from request headers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Geo headers are platform-specific, so their names come from config
//! - Empty header values count as absent

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::GeoConfig;
use crate::locale::{GeoSignal, HeaderPresence};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Country codes platforms use for "unknown" (`XX`) and Tor exits (`T1`).
const UNKNOWN_COUNTRIES: [&str; 2] = ["XX", "T1"];

/// Makes UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeEdgeRequestId;

impl MakeRequestId for MakeEdgeRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-ID layer.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Everything the locale engine looks at, lifted out of the headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSignals {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub cookie: Option<String>,
    pub presence: HeaderPresence,
    pub geo: GeoSignal,
}

impl RequestSignals {
    pub fn from_headers(headers: &HeaderMap, geo: &GeoConfig) -> Self {
        let country = header_str(headers, &geo.country_header)
            .filter(|c| !UNKNOWN_COUNTRIES.contains(&c.as_str()));

        Self {
            user_agent: header_str(headers, header::USER_AGENT.as_str()),
            accept_language: header_str(headers, header::ACCEPT_LANGUAGE.as_str()),
            cookie: cookie_header(headers),
            presence: HeaderPresence {
                accept: header_str(headers, header::ACCEPT.as_str()).is_some(),
                accept_language: header_str(headers, header::ACCEPT_LANGUAGE.as_str()).is_some(),
                accept_encoding: header_str(headers, header::ACCEPT_ENCODING.as_str()).is_some(),
            },
            geo: GeoSignal {
                country,
                region: header_str(headers, &geo.region_header),
                city: header_str(headers, &geo.city_header),
            },
        }
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or_default()
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// HTTP/2 clients may split cookies across several headers; join them back.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
