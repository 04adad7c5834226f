//! Kubernetes operator for `Static` and `StaticAPI` resources.
//!
//! # Controllers
//!
//! ```text
//! Static ──► reconcile ──► Deployment + Service (owned) ──► Static.status
//!              │ error
//!              └──► error_policy ──► requeue with backoff
//!
//! StaticAPI ──► reconcile_api ──► StaticAPI.status {accepted, message}
//! ```
//!
//! Both controllers run in one process and stop together when the shared
//! [`Shutdown`] fires. Deleting a `Static` cascades to its children through
//! owner references, so there is no finalizer.

pub mod client;
pub mod desired;
pub mod endpoint;
pub mod error;
pub mod reconcile;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};

pub use client::{ClusterClient, KubeClusterClient, FIELD_MANAGER};
pub use desired::{DesiredWorkload, TlsMaterial, DEFAULT_IMAGE};
pub use endpoint::{derive_api_status, reconcile_static_api};
pub use error::Error;
pub use reconcile::{derive_status, plan_upsert, reconcile_static, ReconcileOutcome, Upsert, UpsertOutcome};

use crate::crd::{Static, StaticApi};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::BackoffPolicy;

/// Watch timeout, kept under the API server's default request timeout.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Requeue while replicas are still coming up.
const NOT_READY_REQUEUE: Duration = Duration::from_secs(15);

/// Periodic resync once ready.
const READY_REQUEUE: Duration = Duration::from_secs(300);

/// Shared reconcile state.
pub struct Context {
    pub client: Arc<dyn ClusterClient>,
    pub default_image: String,
    pub backoff: BackoffPolicy,
    /// Consecutive failures per `namespace/name`.
    failures: DashMap<String, u32>,
}

impl Context {
    pub fn new(client: Arc<dyn ClusterClient>, default_image: impl Into<String>) -> Self {
        Self {
            client,
            default_image: default_image.into(),
            backoff: BackoffPolicy::default(),
            failures: DashMap::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Current consecutive failure count for an object.
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).map(|count| *count).unwrap_or(0)
    }

    fn record_failure(&self, key: String) -> u32 {
        let mut entry = self.failures.entry(key).or_insert(0);
        *entry += 1;
        *entry
    }

    fn reset_failures(&self, key: &str) {
        self.failures.remove(key);
    }
}

/// Operator process settings.
#[derive(Debug, Clone)]
pub struct OperatorSettings {
    /// Watch scope; all namespaces when `None`.
    pub namespace: Option<String>,
    pub default_image: String,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            namespace: None,
            default_image: DEFAULT_IMAGE.to_string(),
        }
    }
}

fn object_key<K: ResourceExt>(resource: &K) -> Result<(String, String), Error> {
    let namespace = resource.namespace().ok_or(Error::MissingObjectKey("namespace"))?;
    Ok((namespace, resource.name_any()))
}

fn failure_key<K: ResourceExt>(resource: &K) -> String {
    format!("{}/{}", resource.namespace().unwrap_or_default(), resource.name_any())
}

/// Reconcile one `Static`.
pub async fn reconcile(resource: Arc<Static>, ctx: Arc<Context>) -> Result<Action, Error> {
    let (namespace, name) = object_key(resource.as_ref())?;

    let outcome = reconcile_static(ctx.client.as_ref(), &namespace, &name, &ctx.default_image).await?;
    ctx.reset_failures(&failure_key(resource.as_ref()));
    metrics::record_reconcile("Static", "success");

    let action = match outcome {
        ReconcileOutcome::Gone | ReconcileOutcome::Deleting => Action::await_change(),
        ReconcileOutcome::Applied { ready: false, .. } => Action::requeue(NOT_READY_REQUEUE),
        ReconcileOutcome::Applied { ready: true, .. } => Action::requeue(READY_REQUEUE),
    };
    Ok(action)
}

/// Requeue a failed `Static` with per-object exponential backoff.
pub fn error_policy(resource: Arc<Static>, error: &Error, ctx: Arc<Context>) -> Action {
    requeue_with_backoff("Static", resource.as_ref(), error, &ctx)
}

/// Reconcile one `StaticAPI`.
pub async fn reconcile_api(resource: Arc<StaticApi>, ctx: Arc<Context>) -> Result<Action, Error> {
    reconcile_static_api(ctx.client.as_ref(), resource.as_ref()).await?;
    ctx.reset_failures(&failure_key(resource.as_ref()));
    metrics::record_reconcile("StaticAPI", "success");
    Ok(Action::await_change())
}

pub fn error_policy_api(resource: Arc<StaticApi>, error: &Error, ctx: Arc<Context>) -> Action {
    requeue_with_backoff("StaticAPI", resource.as_ref(), error, &ctx)
}

fn requeue_with_backoff<K: ResourceExt>(kind: &'static str, resource: &K, error: &Error, ctx: &Context) -> Action {
    let key = failure_key(resource);
    let attempt = ctx.record_failure(key.clone());
    let delay = ctx.backoff.delay(attempt);
    metrics::record_reconcile(kind, error.metric_label());

    tracing::warn!(
        kind,
        object = %key,
        error = %error,
        attempt,
        delay_ms = delay.as_millis() as u64,
        "Reconciliation failed, requeueing"
    );
    Action::requeue(delay)
}

fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    }
}

/// Run both controllers until `shutdown` fires.
pub async fn run(client: Client, settings: OperatorSettings, shutdown: &Shutdown) {
    let namespace = settings.namespace.as_deref();
    let ctx = Arc::new(Context::new(
        Arc::new(KubeClusterClient::new(client.clone())),
        settings.default_image.clone(),
    ));

    tracing::info!(
        namespace = namespace.unwrap_or("*"),
        default_image = %settings.default_image,
        "Starting controllers"
    );

    let statics: Api<Static> = scoped_api(client.clone(), namespace);
    let deployments: Api<Deployment> = scoped_api(client.clone(), namespace);
    let services: Api<Service> = scoped_api(client.clone(), namespace);
    let static_apis: Api<StaticApi> = scoped_api(client, namespace);

    let static_ctrl = Controller::new(statics, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .owns(deployments, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .owns(services, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .graceful_shutdown_on(shutdown.notified())
        .run(reconcile, error_policy, ctx.clone())
        .for_each(log_reconcile_result("Static"));

    let api_ctrl = Controller::new(static_apis, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .graceful_shutdown_on(shutdown.notified())
        .run(reconcile_api, error_policy_api, ctx)
        .for_each(log_reconcile_result("StaticAPI"));

    futures_util::future::join(static_ctrl, api_ctrl).await;
    tracing::info!("Controllers stopped");
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(object) => tracing::debug!(?object, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconcile::tests::{static_resource, FakeCluster};
    use crate::crd::StaticSpec;

    fn context(cluster: FakeCluster) -> Arc<Context> {
        Arc::new(
            Context::new(Arc::new(cluster), DEFAULT_IMAGE)
                .with_backoff(BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(300))),
        )
    }

    #[tokio::test]
    async fn test_error_policy_counts_failures() {
        let ctx = context(FakeCluster::default());
        let resource = Arc::new(static_resource(StaticSpec::default()));
        let error = Error::Configuration("bad tls".into());

        error_policy(resource.clone(), &error, ctx.clone());
        error_policy(resource.clone(), &error, ctx.clone());
        error_policy(resource, &error, ctx.clone());

        assert_eq!(ctx.failures("mocks/mock"), 3);
        assert_eq!(ctx.failures("mocks/other"), 0);
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let resource = static_resource(StaticSpec::default());
        let ctx = context(FakeCluster::with_static(resource.clone()));
        let resource = Arc::new(resource);

        error_policy(resource.clone(), &Error::Configuration("x".into()), ctx.clone());
        assert_eq!(ctx.failures("mocks/mock"), 1);

        let action = reconcile(resource, ctx.clone()).await.unwrap();
        assert_eq!(action, Action::requeue(NOT_READY_REQUEUE));
        assert_eq!(ctx.failures("mocks/mock"), 0);
    }

    #[tokio::test]
    async fn test_missing_static_awaits_change() {
        let ctx = context(FakeCluster::default());
        let resource = Arc::new(static_resource(StaticSpec::default()));

        let action = reconcile(resource, ctx).await.unwrap();
        assert_eq!(action, Action::await_change());
    }
}
