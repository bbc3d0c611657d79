//! Analytics subsystem.
//!
//! # Data Flow
//! ```text
//! request handler
//!     → recorder.rs (try_send, never waits)
//!     → bounded mpsc queue
//!     → AnalyticsWorker task
//!     → store.rs (DashMap with retention, optional JSON persistence)
//!     → admin API summary
//! ```
//!
//! # Design Decisions
//! - Recording is best-effort: drops are logged and counted, never surfaced
//! - Retention is enforced by a periodic purge, not on read

pub mod event;
pub mod recorder;
pub mod store;

pub use event::{AnalyticsEvent, BotRequestEvent, LocaleRedirectEvent};
pub use recorder::{AnalyticsRecorder, AnalyticsWorker};
pub use store::{AnalyticsError, AnalyticsSink, AnalyticsStore, AnalyticsSummary};
