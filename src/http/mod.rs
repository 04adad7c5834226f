//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned or propagated)
//!     → handlers.rs (snapshot live table, exact path lookup)
//!     → Endpoint::respond (headers, status, body) or 404/405
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use handlers::AppState;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, SHUTDOWN_GRACE_PERIOD};
