//! Kubernetes access used by the reconcilers.
//!
//! The trait is the seam between reconcile logic and the API server: tests
//! drive the reconcilers with an in-memory implementation or a mock.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;

use crate::controller::error::Error;
use crate::crd::{Static, StaticApi, StaticApiStatus, StaticStatus};

/// Field manager recorded on every write.
pub const FIELD_MANAGER: &str = "static-operator";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a Static; `None` when it does not exist.
    async fn get_static(&self, namespace: &str, name: &str) -> Result<Option<Static>, Error>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, Error>;

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, Error>;

    async fn replace_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, Error>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, Error>;

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, Error>;

    async fn replace_service(&self, namespace: &str, service: &Service) -> Result<Service, Error>;

    /// Merge-patch the status subresource of a Static.
    async fn patch_static_status(&self, namespace: &str, name: &str, status: &StaticStatus) -> Result<(), Error>;

    /// Merge-patch the status subresource of a StaticAPI.
    async fn patch_static_api_status(
        &self,
        namespace: &str,
        name: &str,
        status: &StaticApiStatus,
    ) -> Result<(), Error>;
}

/// Production implementation backed by a kube client.
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }

    fn patch_params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

fn object_name(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> Result<&str, Error> {
    meta.name.as_deref().ok_or(Error::MissingObjectKey("name"))
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_static(&self, namespace: &str, name: &str) -> Result<Option<Static>, Error> {
        let api: Api<Static> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&Self::post_params(), deployment).await?)
    }

    async fn replace_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let name = object_name(&deployment.metadata)?;
        Ok(api.replace(name, &Self::post_params(), deployment).await?)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&Self::post_params(), service).await?)
    }

    async fn replace_service(&self, namespace: &str, service: &Service) -> Result<Service, Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let name = object_name(&service.metadata)?;
        Ok(api.replace(name, &Self::post_params(), service).await?)
    }

    async fn patch_static_status(&self, namespace: &str, name: &str, status: &StaticStatus) -> Result<(), Error> {
        let api: Api<Static> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &Self::patch_params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn patch_static_api_status(
        &self,
        namespace: &str,
        name: &str,
        status: &StaticApiStatus,
    ) -> Result<(), Error> {
        let api: Api<StaticApi> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &Self::patch_params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
