//! Locale decision subsystem.
//!
//! # Data Flow
//! ```text
//! request metadata
//!     → cookie.rs (stored preference, validated)
//!     → geo.rs (country → region → city tables)
//!     → accept_language.rs (ranked browser preferences)
//!     → engine.rs (priority cascade + weighted conflict resolution)
//!     → DecisionResult { final, confidence, sources }
//!
//! bot.rs runs separately; callers gate redirects on it first.
//! ```
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no shared mutable state
//! - Config is compiled once into a `LocaleEngine` and passed explicitly
//! - Malformed input degrades to "no signal", never to an error

pub mod accept_language;
pub mod bot;
pub mod cookie;
pub mod engine;
pub mod geo;
pub mod types;

pub use accept_language::parse_accept_language;
pub use engine::{resolve_conflict, ConflictWinner, LocaleEngine};
pub use types::{
    BotClassification, BotReason, DecisionResult, DecisionSource, EngineError, GeoClassification,
    GeoSignal, GeoSource, HeaderPresence, LanguagePreference, Locale, SupportedLocales,
};
