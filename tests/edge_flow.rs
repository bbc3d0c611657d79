//! End-to-end tests for redirects and origin passthrough.

use std::sync::Arc;
use std::time::Duration;

use locale_edge::analytics::{AnalyticsError, AnalyticsEvent, AnalyticsSink};
use locale_edge::config::{load_config, ConfigWatcher};
use locale_edge::http::HttpServer;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use reqwest::StatusCode;

mod common;

use common::{
    browser_get, client, eventually, start_edge, start_mock_origin, start_server,
    start_server_with_updates, test_config,
};

fn header<'a>(res: &'a reqwest::Response, name: &str) -> &'a str {
    res.headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {}", name))
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_german_visitor_is_redirected_to_de() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;

    let res = browser_get(&client(), &edge.url("/"))
        .header(ACCEPT_LANGUAGE, "de-DE,de;q=0.9,en;q=0.8")
        .header("cf-ipcountry", "DE")
        .send()
        .await
        .expect("edge unreachable");

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(header(&res, "location"), format!("http://{}/de", edge.addr));
    assert_eq!(header(&res, "x-redirect-reason"), "country");
    assert_eq!(header(&res, "x-detected-locale"), "de");
    assert_eq!(header(&res, "x-confidence-score"), "0.95");
    assert_eq!(header(&res, "cache-control"), "public, max-age=1800");
    assert_eq!(header(&res, "vary"), "Accept-Language, Cookie, cf-ipcountry");
    assert_eq!(header(&res, "x-geo-data"), "DE-unknown");
    assert!(header(&res, "x-processing-time").ends_with("ms"));
    assert!(uuid::Uuid::parse_str(header(&res, "x-request-id")).is_ok());

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_cookie_beats_geo() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;

    let res = browser_get(&client(), &edge.url("/"))
        .header(ACCEPT_LANGUAGE, "de")
        .header(COOKIE, "session=abc; pm_lang=en")
        .header("cf-ipcountry", "AT")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(header(&res, "location").ends_with("/en"));
    assert_eq!(header(&res, "x-redirect-reason"), "cookie");
    assert_eq!(header(&res, "x-confidence-score"), "1.00");
    assert_eq!(header(&res, "cache-control"), "public, max-age=1800");

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_language_only_and_fallback() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;
    let client = client();

    let res = browser_get(&client, &edge.url("/"))
        .header(ACCEPT_LANGUAGE, "fr-FR,en-US;q=0.9")
        .header("cf-ipcountry", "US")
        .send()
        .await
        .unwrap();
    assert!(header(&res, "location").ends_with("/en"));
    assert_eq!(header(&res, "x-redirect-reason"), "accept-language");
    assert_eq!(header(&res, "x-confidence-score"), "0.80");
    assert_eq!(header(&res, "cache-control"), "public, max-age=300");
    assert_eq!(header(&res, "x-geo-data"), "US-unknown");

    let res = browser_get(&client, &edge.url("/"))
        .header(ACCEPT_LANGUAGE, "ja")
        .send()
        .await
        .unwrap();
    assert!(header(&res, "location").ends_with("/en"));
    assert_eq!(header(&res, "x-redirect-reason"), "");
    assert_eq!(header(&res, "x-confidence-score"), "0.00");
    assert_eq!(header(&res, "x-geo-data"), "unknown-unknown");

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_geo_wins_conflict_with_language() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;

    let res = browser_get(&client(), &edge.url("/"))
        .header(ACCEPT_LANGUAGE, "en-GB")
        .header("cf-ipcountry", "CH")
        .send()
        .await
        .unwrap();

    assert!(header(&res, "location").ends_with("/de"));
    assert_eq!(header(&res, "x-redirect-reason"), "country,geo-priority");
    assert_eq!(header(&res, "x-confidence-score"), "0.66");

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_forwarded_proto_is_honoured() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;

    let res = browser_get(&client(), &edge.url("/"))
        .header(ACCEPT_LANGUAGE, "de")
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();

    assert_eq!(header(&res, "location"), format!("https://{}/de", edge.addr));
    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_non_root_paths_reach_origin() {
    let (origin, seen) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;
    let client = client();

    for path in ["/de", "/assets/app.js?v=2", "/en/pricing"] {
        let res = browser_get(&client, &edge.url(path))
            .header("cf-ipcountry", "DE")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), format!("origin {}", path));
    }

    let heads = seen.lock().unwrap();
    assert_eq!(heads.len(), 3);
    assert!(heads.iter().all(|h| h.contains("x-request-id: ")));

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_crawlers_get_origin_content() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;
    let client = client();

    let res = client
        .get(edge.url("/"))
        .header(USER_AGENT, "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)")
        .header("cf-ipcountry", "DE")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "origin /");

    // No user agent at all.
    let res = client.get(edge.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_low_confidence_bot_is_still_redirected() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;

    // "curl" plus a short user agent scores exactly 0.7: a bot, but under the gate.
    let res = client()
        .get(edge.url("/"))
        .header(USER_AGENT, "curl/8.4.0")
        .header("accept", "*/*")
        .header("accept-encoding", "gzip")
        .header(ACCEPT_LANGUAGE, "de")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(header(&res, "location").ends_with("/de"));
    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_origin_down_is_bad_gateway() {
    let edge = start_edge(test_config(common::closed_port().await)).await;

    let res = browser_get(&client(), &edge.url("/index.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    // Redirects do not depend on the origin.
    let res = browser_get(&client(), &edge.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_redirects_and_bots_are_recorded() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;
    let client = client();

    browser_get(&client, &edge.url("/"))
        .header("cf-ipcountry", "AT")
        .send()
        .await
        .unwrap();
    client
        .get(edge.url("/"))
        .header(USER_AGENT, "Twitterbot/1.0")
        .send()
        .await
        .unwrap();

    let store = edge.state.store.clone();
    assert!(common::eventually(|| store.len() == 2).await);

    let summary = store.summary();
    assert_eq!(summary.locale_redirects, 1);
    assert_eq!(summary.bot_requests, 1);
    assert_eq!(summary.redirects_by_locale["de"], 1);
    assert_eq!(summary.redirects_by_source["country"], 1);
    assert_eq!(summary.bots_by_reason["definitive-bot"], 1);

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_analytics_disabled_records_nothing() {
    let (origin, _) = start_mock_origin().await;
    let mut config = test_config(origin);
    config.analytics.enabled = false;
    let edge = start_edge(config).await;

    let res = browser_get(&client(), &edge.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(!edge.state.recorder.is_enabled());
    assert!(edge.state.store.is_empty());

    edge.shutdown.trigger();
}

struct FailingSink;

impl AnalyticsSink for FailingSink {
    fn put(&self, _key: String, _event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        Err(AnalyticsError::Unavailable("storage offline".into()))
    }
}

#[tokio::test]
async fn test_failing_analytics_never_affects_redirects() {
    let (origin, _) = start_mock_origin().await;
    let server = HttpServer::with_sink(test_config(origin), Arc::new(FailingSink)).unwrap();
    let edge = start_server(server).await;
    let client = client();

    for _ in 0..5 {
        let res = browser_get(&client, &edge.url("/"))
            .header(ACCEPT_LANGUAGE, "de")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert!(header(&res, "location").ends_with("/de"));
    }

    edge.shutdown.trigger();
}

#[tokio::test]
async fn test_config_reload_swaps_engine() {
    let (origin, _) = start_mock_origin().await;
    let edge = start_edge(test_config(origin)).await;

    let mut config = test_config(origin);
    config.locales.fallback = "de".into();
    edge.state.reload(config).unwrap();

    let res = browser_get(&client(), &edge.url("/")).send().await.unwrap();
    assert!(header(&res, "location").ends_with("/de"));
    assert_eq!(header(&res, "x-confidence-score"), "0.00");

    let mut broken = test_config(origin);
    broken.locales.fallback = "fr".into();
    assert!(edge.state.reload(broken).is_err());
    assert_eq!(edge.state.inner.load().engine.locales().fallback(), "de");

    edge.shutdown.trigger();
}

fn edge_toml(origin: std::net::SocketAddr, fallback: &str) -> String {
    format!(
        "[upstream]\naddress = \"{}\"\n\n\
         [locales]\nsupported = [\"de\", \"en\"]\nfallback = \"{}\"\ncookie_name = \"pm_lang\"\n\n\
         [observability]\nmetrics_enabled = false\n",
        origin, fallback
    )
}

#[tokio::test]
async fn test_file_change_reloads_running_edge() {
    let (origin, _) = start_mock_origin().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edge.toml");
    std::fs::write(&path, edge_toml(origin, "en")).unwrap();

    let (watcher, updates) = ConfigWatcher::new(&path);
    let _watcher = watcher.run().unwrap();
    let server = HttpServer::new(load_config(&path).unwrap()).unwrap();
    let edge = start_server_with_updates(server, updates).await;

    let res = browser_get(&client(), &edge.url("/")).send().await.unwrap();
    assert!(header(&res, "location").ends_with("/en"));

    std::fs::write(&path, edge_toml(origin, "de")).unwrap();
    let state = edge.state.clone();
    assert!(eventually(|| state.inner.load().engine.locales().fallback() == "de").await);

    let res = browser_get(&client(), &edge.url("/")).send().await.unwrap();
    assert!(header(&res, "location").ends_with("/de"));

    // Unsupported fallback fails validation; the running config stays.
    std::fs::write(&path, edge_toml(origin, "fr")).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(edge.state.inner.load().engine.locales().fallback(), "de");

    let res = browser_get(&client(), &edge.url("/")).send().await.unwrap();
    assert!(header(&res, "location").ends_with("/de"));

    edge.shutdown.trigger();
}
