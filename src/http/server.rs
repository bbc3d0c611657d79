//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the root redirect handler and a passthrough fallback
//! - Wire up middleware (timeout, concurrency limit, request ID, tracing)
//! - Spawn background tasks (analytics recorder, retention purge, config reload)
//! - Bind server to listener, with optional TLS
//!
//! # Design Decisions
//! - Only the bare root path is ever redirected; everything else is forwarded
//! - Config and engine are swapped atomically, so a request sees one consistent pair
//! - Analytics never sit on the request path: events go through a bounded queue

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::analytics::{
    AnalyticsError, AnalyticsEvent, AnalyticsRecorder, AnalyticsSink, AnalyticsStore, AnalyticsWorker,
    BotRequestEvent, LocaleRedirectEvent,
};
use crate::config::EdgeConfig;
use crate::http::passthrough::{self, UpstreamClient};
use crate::http::request::{request_id, MakeEdgeRequestId, RequestSignals, X_REQUEST_ID};
use crate::http::response::{redirect_response, RedirectContext};
use crate::http::tls::load_tls_config;
use crate::locale::{EngineError, LocaleEngine};
use crate::observability::metrics;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Locale engine: {0}")]
    Engine(#[from] EngineError),

    #[error("Analytics store: {0}")]
    Analytics(#[from] AnalyticsError),
}

/// Configuration paired with the engine built from it.
pub struct EdgeState {
    pub config: EdgeConfig,
    pub engine: LocaleEngine,
}

impl EdgeState {
    pub fn new(config: EdgeConfig) -> Result<Self, EngineError> {
        let engine = LocaleEngine::from_config(&config)?;
        Ok(Self { config, engine })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<EdgeState>>,
    pub client: UpstreamClient,
    pub recorder: AnalyticsRecorder,
    pub store: AnalyticsStore,
    pub started_at: Instant,
}

impl AppState {
    /// Rebuild the engine from `config` and swap it in. The old pair stays on failure.
    pub fn reload(&self, config: EdgeConfig) -> Result<(), EngineError> {
        let pending = restart_required(&self.inner.load().config, &config);
        if !pending.is_empty() {
            tracing::warn!(sections = ?pending, "Changed settings only take effect after a restart");
        }

        let state = EdgeState::new(config)?;
        self.inner.store(Arc::new(state));
        Ok(())
    }
}

/// Settings fixed when the server starts: the listener, middleware, upstream
/// client, analytics pipeline, exporters and admin listener.
pub fn restart_required(current: &EdgeConfig, next: &EdgeConfig) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if current.listener != next.listener {
        sections.push("listener");
    }
    if current.timeouts != next.timeouts {
        sections.push("timeouts");
    }
    if current.upstream.connect_timeout_secs != next.upstream.connect_timeout_secs {
        sections.push("upstream.connect_timeout_secs");
    }
    if current.analytics != next.analytics {
        sections.push("analytics");
    }
    if current.observability != next.observability {
        sections.push("observability");
    }
    if current.admin != next.admin {
        sections.push("admin");
    }
    sections
}

/// HTTP server for the locale edge.
pub struct HttpServer {
    router: Router,
    state: AppState,
    worker: Option<AnalyticsWorker>,
}

impl HttpServer {
    /// Create a server whose analytics go to the in-memory store.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let store = Self::open_store(&config)?;
        Self::assemble(config, store.clone(), Arc::new(store))
    }

    /// Create a server whose analytics go to `sink` instead of the store.
    pub fn with_sink(config: EdgeConfig, sink: Arc<dyn AnalyticsSink>) -> Result<Self, ServerError> {
        let store = AnalyticsStore::new(config.analytics.retention(), None);
        Self::assemble(config, store, sink)
    }

    fn open_store(config: &EdgeConfig) -> Result<AnalyticsStore, AnalyticsError> {
        let retention = config.analytics.retention();
        match &config.analytics.persistence_path {
            Some(path) => AnalyticsStore::load_from_file(&PathBuf::from(path), retention),
            None => Ok(AnalyticsStore::new(retention, None)),
        }
    }

    fn assemble(config: EdgeConfig, store: AnalyticsStore, sink: Arc<dyn AnalyticsSink>) -> Result<Self, ServerError> {
        let (recorder, worker) = if config.analytics.enabled {
            let (recorder, rx) = AnalyticsRecorder::channel(config.analytics.channel_capacity);
            (recorder, Some(AnalyticsWorker::new(rx, sink)))
        } else {
            (AnalyticsRecorder::disabled(), None)
        };

        let client = passthrough::build_client(&config.upstream);
        let router = Self::build_router(&config);
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(EdgeState::new(config)?)),
            client,
            recorder,
            store,
            started_at: Instant::now(),
        };

        let router = router.with_state(state.clone());
        Ok(Self { router, state, worker })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig) -> Router<AppState> {
        Router::new()
            .route("/", any(root_handler))
            .fallback(fallback_handler)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections.max(1)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeEdgeRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// Shared state, for mounting the admin API next to this server.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        let config = self.state.inner.load_full().config.clone();

        let worker = self
            .worker
            .map(|worker| tokio::spawn(worker.run(shutdown.resubscribe())));

        if config.analytics.enabled {
            let store = self.state.store.clone();
            let interval = Duration::from_secs(config.analytics.purge_interval_secs.max(1));
            tokio::spawn(store.run_purge(interval, shutdown.resubscribe()));
        }

        tokio::spawn(apply_config_updates(
            self.state.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        let app = self.router.into_make_service();
        match &config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                        tracing::info!("Shutdown signal received");
                    })
                    .await?;
            }
        }

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Analytics recorder task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Apply validated configs from the watcher until shutdown.
async fn apply_config_updates(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<EdgeConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => match state.reload(config) {
                    Ok(()) => {
                        metrics::record_config_reload(true);
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        metrics::record_config_reload(false);
                        tracing::error!(error = %e, "Rejected configuration update");
                    }
                },
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}

/// Redirect for `/`, unless the client looks like a crawler.
async fn root_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let edge = state.inner.load_full();
    let config = &edge.config;
    let request_id = request_id(request.headers());
    let signals = RequestSignals::from_headers(request.headers(), &config.geo);

    let bot = edge.engine.classify_bot(signals.user_agent(), signals.presence);
    if bot.is_bot && bot.confidence > config.redirect.bot_confidence_gate {
        tracing::info!(
            request_id = %request_id,
            reason = %bot.reason,
            confidence = bot.confidence,
            "Bot detected, serving origin content"
        );
        metrics::record_bot_request(bot.reason.as_str());
        metrics::record_passthrough("bot");
        state.recorder.record(AnalyticsEvent::BotRequest(BotRequestEvent::new(
            signals.user_agent(),
            &signals.geo,
            &bot,
            config.analytics.user_agent_max_len,
        )));
        return passthrough::forward(&state.client, &config.upstream, request).await;
    }

    let decision = edge.engine.decide(
        signals.user_agent.as_deref(),
        signals.accept_language.as_deref(),
        signals.cookie.as_deref(),
        &signals.geo,
    );
    let elapsed = start.elapsed();

    let primary = decision.sources.first().map(|s| s.as_str()).unwrap_or("fallback");
    metrics::record_redirect(decision.final_locale.as_str(), primary, elapsed);
    tracing::info!(
        request_id = %request_id,
        locale = %decision.final_locale,
        confidence = decision.confidence,
        sources = %decision.sources_header(),
        country = signals.geo.country.as_deref().unwrap_or("unknown"),
        "Locale redirect"
    );

    state.recorder.record(AnalyticsEvent::LocaleRedirect(LocaleRedirectEvent::new(
        &decision,
        &signals.geo,
        signals.accept_language.as_deref(),
        signals.user_agent(),
        elapsed.as_millis() as u64,
        config.analytics.user_agent_max_len,
    )));

    let ctx = RedirectContext::from_headers(request.headers(), &signals.geo, &config.geo.country_header, elapsed);
    redirect_response(&decision, &ctx, &config.redirect)
}

/// Every non-root path goes straight to the origin.
async fn fallback_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let edge = state.inner.load_full();
    metrics::record_passthrough("path");
    passthrough::forward(&state.client, &edge.config.upstream, request).await
}
