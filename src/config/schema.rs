//! Process configuration for the server binary.
//!
//! Flags fall back to environment variables so the same binary runs from a
//! shell or inside a pod whose environment is injected by the operator.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// File name looked up inside `--endpoints-path`.
pub const ENDPOINTS_FILE_NAME: &str = "endpoints.yaml";

/// Command line of `static-server`.
#[derive(Debug, Clone, Parser)]
#[command(name = "static-server", version, about = "Serve configured static HTTP responses")]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory containing endpoints.yaml.
    #[arg(long, env = "ENDPOINTS_PATH", default_value = ".")]
    pub endpoints_path: PathBuf,

    /// Explicit document path; takes precedence over --endpoints-path.
    #[arg(long, env = "ENDPOINTS_FILE")]
    pub endpoints_file: Option<PathBuf>,

    /// Read endpoints from StaticAPI resources instead of a file.
    #[arg(long, env = "IN_CLUSTER", default_value_t = false)]
    pub in_cluster: bool,

    #[arg(long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    #[arg(long, env = "TLS_ENABLED", default_value_t = false)]
    pub tls_enabled: bool,

    #[arg(long, env = "TLS_CERTIFICATE")]
    pub tls_certificate: Option<PathBuf>,

    #[arg(long, env = "TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    #[arg(long, env = "TLS_CA")]
    pub tls_ca: Option<PathBuf>,

    #[arg(long, env = "TLS_VERIFY_CLIENT", default_value_t = false)]
    pub tls_verify_client: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Shorthand for --log-format pretty.
    #[arg(long, env = "LOG_PRETTY", default_value_t = false)]
    pub log_pretty: bool,

    /// Prometheus exporter address; disabled when unset.
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<SocketAddr>,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

/// Log output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

/// Root configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listener: ListenerConfig,
    pub tls: TlsSettings,
    pub source: SourceConfig,
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl ListenerConfig {
    /// `host:port`, as given on the command line.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// TLS material for the listener.
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub enabled: bool,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ca: Option<PathBuf>,
    pub verify_client: bool,
}

/// Where desired endpoint state comes from.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoints_file: PathBuf,
    pub in_cluster: bool,
    pub namespace: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_address: Option<SocketAddr>,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        let endpoints_file = cli
            .endpoints_file
            .unwrap_or_else(|| cli.endpoints_path.join(ENDPOINTS_FILE_NAME));
        let log_format = if cli.log_pretty {
            LogFormat::Pretty
        } else {
            cli.log_format
        };

        Self {
            listener: ListenerConfig {
                host: cli.host,
                port: cli.port,
                request_timeout_secs: cli.request_timeout_secs,
            },
            tls: TlsSettings {
                enabled: cli.tls_enabled,
                certificate: cli.tls_certificate,
                key: cli.tls_key,
                ca: cli.tls_ca,
                verify_client: cli.tls_verify_client,
            },
            source: SourceConfig {
                endpoints_file,
                in_cluster: cli.in_cluster,
                namespace: cli.namespace.filter(|ns| !ns.is_empty()),
            },
            observability: ObservabilityConfig {
                log_level: cli.log_level,
                log_format,
                metrics_address: cli.metrics_address,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["static-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into()
    }

    #[test]
    fn test_endpoints_file_defaults_under_path() {
        let config = parse(&["--endpoints-path", "/etc/static"]);
        assert_eq!(config.source.endpoints_file, PathBuf::from("/etc/static/endpoints.yaml"));
    }

    #[test]
    fn test_explicit_file_wins() {
        let config = parse(&["--endpoints-path", "/etc/static", "--endpoints-file", "/tmp/e.toml"]);
        assert_eq!(config.source.endpoints_file, PathBuf::from("/tmp/e.toml"));
    }

    #[test]
    fn test_log_pretty_overrides_format() {
        let config = parse(&["--log-format", "compact", "--log-pretty"]);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_bind_address() {
        let config = parse(&["--host", "0.0.0.0", "--port", "9000"]);
        assert_eq!(config.listener.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.listener.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_namespace_means_detect() {
        let config = parse(&["--namespace", ""]);
        assert!(config.source.namespace.is_none());
    }
}
