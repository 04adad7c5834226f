//! Static HTTP endpoint server and Kubernetes operator library

pub mod config;
pub mod controller;
pub mod crd;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod source;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{LiveTable, RoutingTable};
pub use source::{ClusterSource, ConfigSource, FileSource};
