//! Forwarding to the origin.
//!
//! # Responsibilities
//! - Rewrite the request URI to point at the configured upstream
//! - Stream the origin's response back untouched
//! - Map connection failures to `502 Bad Gateway`
//!
//! # Design Decisions
//! - No retries: the origin serves static assets and a failed forward is cheap to repeat client-side
//! - The client's `Host` header is preserved so the origin sees the public host

use std::str::FromStr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, StatusCode, Uri, Version};
use axum::response::Response;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::UpstreamConfig;
use crate::http::request::request_id;
use crate::http::response::error_response;
use crate::observability::metrics;

/// Pooled HTTP client used for every forward.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the upstream client with the configured connect timeout.
pub fn build_client(upstream: &UpstreamConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_secs(upstream.connect_timeout_secs)));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Point `uri` at `upstream`, keeping path and query.
pub fn upstream_uri(uri: &Uri, upstream: &str) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(Authority::from_str(upstream).ok()?);
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    Uri::from_parts(parts).ok()
}

/// Forward `request` to the origin and relay its response.
pub async fn forward(client: &UpstreamClient, upstream: &UpstreamConfig, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers());
    let (mut parts, body) = request.into_parts();

    let Some(uri) = upstream_uri(&parts.uri, &upstream.address) else {
        tracing::error!(request_id = %request_id, upstream = %upstream.address, "Invalid upstream address");
        metrics::record_upstream_error();
        return error_response(StatusCode::BAD_GATEWAY, "Invalid upstream address");
    };

    tracing::debug!(request_id = %request_id, method = %parts.method, uri = %uri, "Forwarding to origin");
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream_error();
            error_response(StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
    }
}
