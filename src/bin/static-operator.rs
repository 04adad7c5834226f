//! static-operator
//!
//! Runs the `Static` and `StaticAPI` controllers.

use std::net::SocketAddr;

use clap::Parser;

use static_server::config::LogFormat;
use static_server::controller::{self, OperatorSettings, DEFAULT_IMAGE};
use static_server::crd::crd_manifests;
use static_server::lifecycle::{spawn_signal_handler, Shutdown};
use static_server::observability::{init_logging, init_metrics};

#[derive(Debug, Parser)]
#[command(name = "static-operator", version, about = "Kubernetes operator for static endpoint servers")]
struct Args {
    /// Log level or filter directive
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Prometheus exporter address; disabled when unset
    #[arg(long, env = "METRICS_ADDRESS")]
    metrics_address: Option<SocketAddr>,

    /// Namespace to watch; all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Image used when a Static does not name one
    #[arg(long, env = "DEFAULT_IMAGE", default_value = DEFAULT_IMAGE)]
    default_image: String,

    /// Print the CustomResourceDefinitions as YAML and exit
    #[arg(long)]
    print_crds: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_crds {
        print!("{}", crd_manifests()?);
        return Ok(());
    }

    init_logging(&args.log_level, args.log_format)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "static-operator starting");

    if rustls::crypto::aws_lc_rs::default_provider().install_default().is_err() {
        tracing::debug!("Crypto provider already installed");
    }

    if let Some(address) = args.metrics_address {
        init_metrics(address)?;
    }

    let client = kube::Client::try_default().await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let settings = OperatorSettings {
        namespace: args.namespace.filter(|ns| !ns.is_empty()),
        default_image: args.default_image,
    };
    controller::run(client, settings, &shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
