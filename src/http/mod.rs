//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, background tasks)
//!     → request.rs (request ID, lift headers into RequestSignals)
//!     → "/" ─┬ bot ──────▶ passthrough.rs (forward to origin)
//!            └ decision ─▶ response.rs (302 + diagnostic headers)
//!     → any other path ──▶ passthrough.rs
//! ```

pub mod passthrough;
pub mod request;
pub mod response;
pub mod server;
pub mod tls;

pub use request::{MakeEdgeRequestId, RequestSignals, X_REQUEST_ID};
pub use server::{AppState, EdgeState, HttpServer, ServerError};
