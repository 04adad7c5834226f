//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! TlsSettings (paths from flags or the operator-injected env)
//!     → tls.rs (read PEM, build rustls ServerConfig)
//!     → RustlsConfig handed to the HTTP server
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently by axum-server
//! - Crypto provider is chosen explicitly (aws-lc-rs)

pub mod tls;

pub use tls::{load_tls_config, TlsError};
