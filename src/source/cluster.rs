//! Cluster-backed desired state: `StaticAPI` resources in one namespace.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;

use crate::crd::StaticApi;
use crate::routing::{DesiredEndpoint, LiveTable};
use crate::source::{sync_logged, ConfigFingerprint, ConfigSource, SourceError, SyncOutcome};

/// Mounted into every pod that runs with a service account.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
pub const FALLBACK_NAMESPACE: &str = "default";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Read access to `StaticAPI` resources.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StaticApiLister: Send + Sync {
    async fn list(&self, namespace: &str) -> Result<Vec<StaticApi>, kube::Error>;
}

pub struct KubeStaticApiLister {
    client: Client,
}

impl KubeStaticApiLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StaticApiLister for KubeStaticApiLister {
    async fn list(&self, namespace: &str) -> Result<Vec<StaticApi>, kube::Error> {
        let api: Api<StaticApi> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

/// Namespace to read from: explicit, else the pod's own, else `default`.
pub fn resolve_namespace(explicit: Option<&str>, service_account_dir: &Path) -> String {
    if let Some(namespace) = explicit.filter(|ns| !ns.is_empty()) {
        return namespace.to_string();
    }

    if service_account_dir.join("token").exists() {
        match std::fs::read_to_string(service_account_dir.join("namespace")) {
            Ok(namespace) if !namespace.trim().is_empty() => return namespace.trim().to_string(),
            Ok(_) => tracing::warn!("Service account namespace file is empty"),
            Err(error) => tracing::warn!(error = %error, "Failed to read service account namespace"),
        }
    }

    FALLBACK_NAMESPACE.to_string()
}

pub struct ClusterSource {
    lister: Arc<dyn StaticApiLister>,
    namespace: String,
    poll_interval: Duration,
    last: Mutex<Option<ConfigFingerprint>>,
}

impl ClusterSource {
    pub fn new(lister: Arc<dyn StaticApiLister>, namespace: impl Into<String>) -> Self {
        Self {
            lister,
            namespace: namespace.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            last: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl ConfigSource for ClusterSource {
    fn name(&self) -> &'static str {
        "cluster"
    }

    async fn load(&self) -> Result<Vec<DesiredEndpoint>, SourceError> {
        let mut resources = self.lister.list(&self.namespace).await?;
        resources.sort_by_key(|resource| resource.name_any());

        Ok(resources
            .iter()
            .map(|resource| DesiredEndpoint::new(resource.name_any(), resource.spec.to_endpoint_spec()))
            .collect())
    }

    /// Rebuild only when the listed content differs from the last rebuild.
    async fn sync(&self, live: &LiveTable) -> Result<SyncOutcome, SourceError> {
        let entries = self.load().await?;
        let fingerprint = ConfigFingerprint::of(&entries)?;

        let mut last = self.last.lock().await;
        if last.as_ref() == Some(&fingerprint) {
            tracing::debug!(namespace = %self.namespace, fingerprint = %fingerprint, "StaticAPI set unchanged");
            return Ok(SyncOutcome::Unchanged);
        }

        let summary = live.reload(&entries);
        tracing::info!(
            namespace = %self.namespace,
            fingerprint = %fingerprint,
            resources = entries.len(),
            "StaticAPI set changed"
        );
        *last = Some(fingerprint);
        Ok(SyncOutcome::Reloaded(summary))
    }

    async fn watch(self: Arc<Self>, live: LiveTable, mut shutdown: broadcast::Receiver<()>) {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll.tick().await;

        tracing::info!(namespace = %self.namespace, interval = ?self.poll_interval, "StaticAPI polling started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(source = self.name(), "Watch loop stopped");
                    break;
                }
                _ = poll.tick() => {
                    sync_logged(self.as_ref(), &live).await;
                }
            }
        }
    }
}
