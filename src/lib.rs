//! Locale edge: picks a language for visitors of a single-page app's root URL.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ "/" ? ──no──▶ http::passthrough ──▶ Origin
//!                                   │
//!                                  yes
//!                                   ▼
//!                       locale::bot (crawler gate) ──bot──▶ http::passthrough
//!                                   │
//!                                 human
//!                                   ▼
//!            locale::engine (cookie ▸ geo ▸ Accept-Language ▸ fallback)
//!                                   │
//!                                   ├──▶ http::response (302 /{locale})
//!                                   └──▶ analytics (queue ▸ recorder ▸ store)
//!
//!     Cross-cutting: config (TOML + hot reload), observability (tracing, Prometheus),
//!                    admin (bearer-protected status/analytics/explain), lifecycle
//! ```

pub mod admin;
pub mod analytics;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod locale;
pub mod observability;

pub use config::schema::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use locale::LocaleEngine;
