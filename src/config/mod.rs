//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags / environment
//!     → schema.rs (clap parse into ServerConfig)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!
//! endpoints document (YAML/TOML/JSON)
//!     → loader.rs (decode, legacy fallback)
//!     → Vec<EndpointSpec> handed to the file source
//! ```
//!
//! # Design Decisions
//! - Process configuration is fixed for the process lifetime
//! - Only the endpoints document is reloaded
//! - Validation separates syntactic (clap/serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{decode_document, encode_document, load_document, ConfigError, DocumentFormat};
pub use schema::{Cli, ListenerConfig, LogFormat, ObservabilityConfig, ServerConfig, SourceConfig, TlsSettings};
pub use validation::{validate_config, SettingsError};
