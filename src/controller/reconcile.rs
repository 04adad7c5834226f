//! Static reconciliation core.
//!
//! Fetch → derive desired children → upsert Deployment and Service → read
//! back the Deployment → write derived status. Written against
//! [`ClusterClient`] so the whole pass is testable without an API server.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;

use crate::controller::client::ClusterClient;
use crate::controller::desired::DesiredWorkload;
use crate::controller::error::Error;
use crate::crd::StaticStatus;

/// What to do with one child object.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<K> {
    Create(K),
    Update(K),
    Unchanged,
}

/// Mutate a copy of `existing` (or of `fresh()` when absent) and decide
/// which write, if any, is needed.
pub fn plan_upsert<K, F, M>(existing: Option<&K>, fresh: F, mutate: M) -> Upsert<K>
where
    K: Clone + PartialEq,
    F: FnOnce() -> K,
    M: Fn(&mut K),
{
    match existing {
        Some(current) => {
            let mut updated = current.clone();
            mutate(&mut updated);
            if &updated == current {
                Upsert::Unchanged
            } else {
                Upsert::Update(updated)
            }
        }
        None => {
            let mut created = fresh();
            mutate(&mut created);
            Upsert::Create(created)
        }
    }
}

/// Result of one child upsert, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        })
    }
}

pub async fn upsert_deployment(client: &dyn ClusterClient, desired: &DesiredWorkload) -> Result<UpsertOutcome, Error> {
    let existing = client.get_deployment(&desired.namespace, &desired.name).await?;
    let plan = plan_upsert(
        existing.as_ref(),
        || desired.new_deployment(),
        |deployment| desired.apply_to_deployment(deployment),
    );

    let outcome = match plan {
        Upsert::Create(deployment) => {
            client.create_deployment(&desired.namespace, &deployment).await?;
            UpsertOutcome::Created
        }
        Upsert::Update(deployment) => {
            client.replace_deployment(&desired.namespace, &deployment).await?;
            UpsertOutcome::Updated
        }
        Upsert::Unchanged => UpsertOutcome::Unchanged,
    };

    tracing::info!(
        static_name = %desired.name,
        namespace = %desired.namespace,
        outcome = %outcome,
        "Deployment reconciled"
    );
    Ok(outcome)
}

pub async fn upsert_service(client: &dyn ClusterClient, desired: &DesiredWorkload) -> Result<UpsertOutcome, Error> {
    let existing = client.get_service(&desired.namespace, &desired.name).await?;
    let plan = plan_upsert(
        existing.as_ref(),
        || desired.new_service(),
        |service| desired.apply_to_service(service),
    );

    let outcome = match plan {
        Upsert::Create(service) => {
            client.create_service(&desired.namespace, &service).await?;
            UpsertOutcome::Created
        }
        Upsert::Update(service) => {
            client.replace_service(&desired.namespace, &service).await?;
            UpsertOutcome::Updated
        }
        Upsert::Unchanged => UpsertOutcome::Unchanged,
    };

    tracing::info!(
        static_name = %desired.name,
        namespace = %desired.namespace,
        outcome = %outcome,
        "Service reconciled"
    );
    Ok(outcome)
}

/// Parent status from the managed Deployment as it currently stands.
pub fn derive_status(deployment: Option<&Deployment>, desired_replicas: i32, observed_generation: Option<i64>) -> StaticStatus {
    let Some(deployment) = deployment else {
        return StaticStatus {
            ready: false,
            replicas: 0,
            desired_replicas,
            message: Some("Deployment not found".to_string()),
            observed_generation,
        };
    };

    let status = deployment.status.as_ref();
    let ready_replicas = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    let total_replicas = status.and_then(|s| s.replicas).unwrap_or(0);
    let ready = ready_replicas > 0;

    StaticStatus {
        ready,
        replicas: ready_replicas,
        desired_replicas,
        message: Some(if ready {
            format!("{ready_replicas}/{total_replicas} replicas ready")
        } else {
            "Waiting for replicas to be ready".to_string()
        }),
        observed_generation,
    }
}

/// What a reconcile pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The Static no longer exists.
    Gone,
    /// Deletion in progress; owner references cascade to the children.
    Deleting,
    Applied {
        deployment: UpsertOutcome,
        service: UpsertOutcome,
        status_written: bool,
        ready: bool,
    },
}

/// One full pass for the Static `namespace/name`.
pub async fn reconcile_static(
    client: &dyn ClusterClient,
    namespace: &str,
    name: &str,
    default_image: &str,
) -> Result<ReconcileOutcome, Error> {
    let Some(resource) = client.get_static(namespace, name).await? else {
        tracing::debug!(static_name = %name, namespace = %namespace, "Static not found, nothing to do");
        return Ok(ReconcileOutcome::Gone);
    };

    if resource.metadata.deletion_timestamp.is_some() {
        tracing::debug!(static_name = %name, namespace = %namespace, "Static is being deleted");
        return Ok(ReconcileOutcome::Deleting);
    }

    let desired = DesiredWorkload::derive(&resource, default_image)?;

    let deployment = upsert_deployment(client, &desired).await?;
    let service = upsert_service(client, &desired).await?;

    let current = client.get_deployment(namespace, name).await?;
    let status = derive_status(current.as_ref(), desired.replicas, resource.metadata.generation);
    let ready = status.ready;

    let status_written = resource.status.as_ref() != Some(&status);
    if status_written {
        client.patch_static_status(namespace, name, &status).await?;
        tracing::info!(
            static_name = %name,
            namespace = %namespace,
            ready = status.ready,
            replicas = status.replicas,
            "Static status updated"
        );
    }

    Ok(ReconcileOutcome::Applied {
        deployment,
        service,
        status_written,
        ready,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::core::ErrorResponse;

    use super::*;
    use crate::controller::client::MockClusterClient;
    use crate::controller::desired::DEFAULT_IMAGE;
    use crate::crd::{Static, StaticApiStatus, StaticSpec, TlsSpec};

    /// In-memory API server that counts writes.
    #[derive(Default)]
    pub(crate) struct FakeCluster {
        pub statics: Mutex<HashMap<String, Static>>,
        pub deployments: Mutex<HashMap<String, Deployment>>,
        pub services: Mutex<HashMap<String, Service>>,
        pub api_statuses: Mutex<HashMap<String, StaticApiStatus>>,
        pub writes: AtomicUsize,
    }

    fn key(namespace: &str, name: &str) -> String {
        format!("{namespace}/{name}")
    }

    impl FakeCluster {
        pub fn with_static(resource: Static) -> Self {
            let cluster = Self::default();
            let k = key(resource.metadata.namespace.as_deref().unwrap(), resource.metadata.name.as_deref().unwrap());
            cluster.statics.lock().unwrap().insert(k, resource);
            cluster
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn store<K: Clone>(&self, map: &Mutex<HashMap<String, K>>, namespace: &str, name: Option<&str>, obj: &K) -> K {
            self.writes.fetch_add(1, Ordering::SeqCst);
            map.lock().unwrap().insert(key(namespace, name.unwrap()), obj.clone());
            obj.clone()
        }
    }

    #[async_trait]
    impl ClusterClient for FakeCluster {
        async fn get_static(&self, namespace: &str, name: &str) -> Result<Option<Static>, Error> {
            Ok(self.statics.lock().unwrap().get(&key(namespace, name)).cloned())
        }

        async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, Error> {
            Ok(self.deployments.lock().unwrap().get(&key(namespace, name)).cloned())
        }

        async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, Error> {
            Ok(self.store(&self.deployments, namespace, deployment.metadata.name.as_deref(), deployment))
        }

        async fn replace_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, Error> {
            Ok(self.store(&self.deployments, namespace, deployment.metadata.name.as_deref(), deployment))
        }

        async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, Error> {
            Ok(self.services.lock().unwrap().get(&key(namespace, name)).cloned())
        }

        async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, Error> {
            Ok(self.store(&self.services, namespace, service.metadata.name.as_deref(), service))
        }

        async fn replace_service(&self, namespace: &str, service: &Service) -> Result<Service, Error> {
            Ok(self.store(&self.services, namespace, service.metadata.name.as_deref(), service))
        }

        async fn patch_static_status(&self, namespace: &str, name: &str, status: &StaticStatus) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if let Some(resource) = self.statics.lock().unwrap().get_mut(&key(namespace, name)) {
                resource.status = Some(status.clone());
            }
            Ok(())
        }

        async fn patch_static_api_status(
            &self,
            namespace: &str,
            name: &str,
            status: &StaticApiStatus,
        ) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.api_statuses
                .lock()
                .unwrap()
                .insert(key(namespace, name), status.clone());
            Ok(())
        }
    }

    pub(crate) fn static_resource(spec: StaticSpec) -> Static {
        let mut resource = Static::new("mock", spec);
        resource.metadata.namespace = Some("mocks".into());
        resource.metadata.uid = Some("uid-1".into());
        resource.metadata.generation = Some(1);
        resource
    }

    #[test]
    fn test_plan_upsert() {
        let bump = |v: &mut Vec<i32>| {
            if v.is_empty() {
                v.push(1);
            }
        };
        assert_eq!(plan_upsert(None, Vec::new, bump), Upsert::Create(vec![1]));
        assert_eq!(plan_upsert(Some(&vec![1]), Vec::new, bump), Upsert::Unchanged);
        assert_eq!(plan_upsert(Some(&vec![]), Vec::new, bump), Upsert::Update(vec![1]));
    }

    #[test]
    fn test_status_messages() {
        let missing = derive_status(None, 2, Some(3));
        assert!(!missing.ready);
        assert_eq!(missing.message.as_deref(), Some("Deployment not found"));
        assert_eq!(missing.observed_generation, Some(3));

        let mut deployment = Deployment::default();
        assert_eq!(
            derive_status(Some(&deployment), 2, None).message.as_deref(),
            Some("Waiting for replicas to be ready")
        );

        deployment.status = Some(DeploymentStatus {
            ready_replicas: Some(1),
            replicas: Some(2),
            ..Default::default()
        });
        let status = derive_status(Some(&deployment), 2, None);
        assert!(status.ready);
        assert_eq!(status.replicas, 1);
        assert_eq!(status.desired_replicas, 2);
        assert_eq!(status.message.as_deref(), Some("1/2 replicas ready"));
    }

    #[tokio::test]
    async fn test_second_pass_writes_nothing() {
        let cluster = FakeCluster::with_static(static_resource(StaticSpec::default()));

        let first = reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();
        assert_eq!(
            first,
            ReconcileOutcome::Applied {
                deployment: UpsertOutcome::Created,
                service: UpsertOutcome::Created,
                status_written: true,
                ready: false,
            }
        );
        assert_eq!(cluster.writes(), 3);

        let second = reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();
        assert_eq!(
            second,
            ReconcileOutcome::Applied {
                deployment: UpsertOutcome::Unchanged,
                service: UpsertOutcome::Unchanged,
                status_written: false,
                ready: false,
            }
        );
        assert_eq!(cluster.writes(), 3);
    }

    #[tokio::test]
    async fn test_readiness_refreshes_status_only() {
        let cluster = FakeCluster::with_static(static_resource(StaticSpec::default()));
        reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();

        cluster
            .deployments
            .lock()
            .unwrap()
            .get_mut("mocks/mock")
            .unwrap()
            .status = Some(DeploymentStatus {
            ready_replicas: Some(1),
            replicas: Some(1),
            ..Default::default()
        });

        let outcome = reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();
        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied {
                deployment: UpsertOutcome::Unchanged,
                status_written: true,
                ready: true,
                ..
            }
        ));
        assert_eq!(cluster.writes(), 4);
    }

    #[tokio::test]
    async fn test_spec_change_updates_deployment() {
        let cluster = FakeCluster::with_static(static_resource(StaticSpec::default()));
        reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();

        cluster.statics.lock().unwrap().get_mut("mocks/mock").unwrap().spec.replicas = Some(3);
        let outcome = reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied {
                deployment: UpsertOutcome::Updated,
                service: UpsertOutcome::Unchanged,
                ..
            }
        ));
        let deployments = cluster.deployments.lock().unwrap();
        assert_eq!(deployments["mocks/mock"].spec.as_ref().unwrap().replicas, Some(3));
    }

    #[tokio::test]
    async fn test_tls_conflict_leaves_children_untouched() {
        let cluster = FakeCluster::with_static(static_resource(StaticSpec::default()));
        reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();
        let before = cluster.deployments.lock().unwrap()["mocks/mock"].clone();
        let writes = cluster.writes();

        cluster.statics.lock().unwrap().get_mut("mocks/mock").unwrap().spec.tls = Some(TlsSpec {
            enabled: true,
            secret_name: Some("certs".into()),
            certificate: Some("/certs/tls.crt".into()),
            ..Default::default()
        });

        let err = reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(cluster.writes(), writes);
        assert_eq!(cluster.deployments.lock().unwrap()["mocks/mock"], before);
    }

    #[tokio::test]
    async fn test_missing_static_is_noop() {
        let cluster = FakeCluster::default();
        let outcome = reconcile_static(&cluster, "mocks", "gone", DEFAULT_IMAGE).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Gone);
        assert_eq!(cluster.writes(), 0);
    }

    #[tokio::test]
    async fn test_deleting_static_is_noop() {
        let mut resource = static_resource(StaticSpec::default());
        let deleted_at: Time = serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z")).unwrap();
        resource.metadata.deletion_timestamp = Some(deleted_at);
        let cluster = FakeCluster::with_static(resource);

        let outcome = reconcile_static(&cluster, "mocks", "mock", DEFAULT_IMAGE).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Deleting);
        assert_eq!(cluster.writes(), 0);
    }

    #[tokio::test]
    async fn test_status_write_failure_surfaces() {
        let mut client = MockClusterClient::new();
        client
            .expect_get_static()
            .returning(|_, _| Ok(Some(static_resource(StaticSpec::default()))));
        client.expect_get_deployment().times(2).returning(|_, _| Ok(None));
        client
            .expect_create_deployment()
            .times(1)
            .returning(|_, deployment| Ok(deployment.clone()));
        client.expect_get_service().returning(|_, _| Ok(None));
        client
            .expect_create_service()
            .times(1)
            .returning(|_, service| Ok(service.clone()));
        client.expect_patch_static_status().times(1).returning(|_, _, _| {
            Err(Error::Kube(kube::Error::Api(ErrorResponse {
                status: "Failure".into(),
                message: "conflict".into(),
                reason: "Conflict".into(),
                code: 409,
            })))
        });

        let err = reconcile_static(&client, "mocks", "mock", DEFAULT_IMAGE).await.unwrap_err();
        assert!(matches!(err, Error::Kube(_)));
    }
}
