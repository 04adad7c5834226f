//! Desired-state sources.
//!
//! # Data Flow
//! ```text
//! FileSource                       ClusterSource
//!   endpoints document               StaticAPI list in namespace
//!   notify events + mtime poll       fixed 5 s poll
//!          │                                │ fingerprint, skip if unchanged
//!          └────────────┬───────────────────┘
//!                       ▼
//!            Vec<DesiredEndpoint>
//!                       ▼
//!            LiveTable::reload (build, swap)
//! ```
//!
//! # Design Decisions
//! - One trait, two implementations; `main` picks one and never branches
//!   on mode again
//! - A failed sync leaves the live table untouched
//! - Each source owns exactly one background loop, stopped by shutdown

pub mod cluster;
pub mod file;
pub mod fingerprint;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::config::ConfigError;
use crate::observability::metrics;
use crate::routing::{DesiredEndpoint, LiveTable, ReloadSummary};

pub use cluster::{resolve_namespace, ClusterSource, KubeStaticApiLister, StaticApiLister};
pub use file::FileSource;
pub use fingerprint::ConfigFingerprint;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to list StaticAPI resources: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to watch endpoints file: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to fingerprint desired state: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// What a sync did to the live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Reloaded(ReloadSummary),
    Unchanged,
}

/// Produces desired endpoint state and keeps a live table in step with it.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Short label for logs and metrics.
    fn name(&self) -> &'static str;

    /// Produce the current desired state, or fail.
    async fn load(&self) -> Result<Vec<DesiredEndpoint>, SourceError>;

    /// Load and hand the result to `live`.
    async fn sync(&self, live: &LiveTable) -> Result<SyncOutcome, SourceError> {
        let entries = self.load().await?;
        Ok(SyncOutcome::Reloaded(live.reload(&entries)))
    }

    /// Run the change-detection loop until shutdown.
    async fn watch(self: Arc<Self>, live: LiveTable, shutdown: broadcast::Receiver<()>);
}

/// Sync once from a watch loop: errors are logged and the table is kept.
pub async fn sync_logged<S: ConfigSource + ?Sized>(source: &S, live: &LiveTable) -> Option<SyncOutcome> {
    match source.sync(live).await {
        Ok(outcome) => {
            let result = match outcome {
                SyncOutcome::Reloaded(_) => "reloaded",
                SyncOutcome::Unchanged => "unchanged",
            };
            metrics::record_reload(source.name(), result);
            Some(outcome)
        }
        Err(error) => {
            metrics::record_reload(source.name(), "error");
            tracing::error!(
                source = source.name(),
                error = %error,
                generation = live.generation(),
                "Reload failed, keeping current routing table"
            );
            None
        }
    }
}
