//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Desired state (file entries or StaticAPI resources)
//!     → endpoint.rs (validate each entry into an Endpoint)
//!     → router.rs (build an immutable RoutingTable, last duplicate wins)
//!     → live.rs (atomic swap of Arc<RoutingTable>)
//!
//! Incoming Request (path, method)
//!     → live.rs (snapshot the current table)
//!     → router.rs (exact path lookup)
//!     → matcher.rs (case-insensitive method match)
//!     → Endpoint response, 405, or 404
//! ```
//!
//! # Design Decisions
//! - Tables are built off to the side and never mutated once published
//! - Exact path matching only, no prefixes or patterns
//! - A bad entry is skipped and logged; it never fails the whole load

pub mod endpoint;
pub mod live;
pub mod matcher;
pub mod router;

pub use endpoint::{DesiredEndpoint, Endpoint, EndpointSpec, MethodResponse, MethodSpec, ValidationError};
pub use live::{LiveTable, ReloadSummary};
pub use matcher::SupportedMethods;
pub use router::{EndpointSummary, RoutingTable, TableSummary};

/// Fixed introspection path listing every loaded endpoint.
pub const INFO_PATH: &str = "/_static/info";
