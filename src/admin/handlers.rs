use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsSummary;
use crate::http::response::cache_max_age;
use crate::http::server::AppState;
use crate::locale::{BotClassification, DecisionResult, GeoSignal, HeaderPresence};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub supported_locales: Vec<String>,
    pub fallback_locale: String,
    pub analytics_enabled: bool,
    pub stored_events: usize,
}

/// Request signals to run through the engine, as query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ExplainQuery {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub cookie: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// What the edge would do with a request carrying the queried signals.
#[derive(Debug, Serialize)]
pub struct Explanation {
    pub bot: BotClassification,
    /// The request would be passed through to the origin unredirected.
    pub bot_gated: bool,
    pub decision: DecisionResult,
    pub cache_max_age: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load();
    let locales = inner.engine.locales();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        supported_locales: locales.iter().map(|l| l.to_string()).collect(),
        fallback_locale: locales.fallback().to_string(),
        analytics_enabled: state.recorder.is_enabled(),
        stored_events: state.store.len(),
    })
}

pub async fn get_analytics(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(state.store.summary())
}

pub async fn get_explain(
    State(state): State<AppState>,
    Query(query): Query<ExplainQuery>,
) -> Json<Explanation> {
    let inner = state.inner.load();
    let presence = HeaderPresence {
        accept_language: query.accept_language.is_some(),
        ..HeaderPresence::browser()
    };

    let bot = inner
        .engine
        .classify_bot(query.user_agent.as_deref().unwrap_or_default(), presence);
    let geo = GeoSignal::new(query.country.as_deref(), query.region.as_deref(), query.city.as_deref());
    let decision = inner.engine.decide(
        query.user_agent.as_deref(),
        query.accept_language.as_deref(),
        query.cookie.as_deref(),
        &geo,
    );

    Json(Explanation {
        bot_gated: bot.is_bot && bot.confidence > inner.config.redirect.bot_confidence_gate,
        bot,
        cache_max_age: cache_max_age(decision.confidence, &inner.config.redirect),
        decision,
    })
}
