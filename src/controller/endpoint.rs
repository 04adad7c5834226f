//! StaticAPI acceptance status.
//!
//! Servers silently skip entries that fail validation; this reconciler runs
//! the same validation and records the verdict on the resource.

use kube::ResourceExt;

use crate::controller::client::ClusterClient;
use crate::controller::error::Error;
use crate::crd::{StaticApi, StaticApiStatus};
use crate::routing::Endpoint;

pub fn derive_api_status(resource: &StaticApi) -> StaticApiStatus {
    let (accepted, message) = match Endpoint::from_spec(&resource.spec.to_endpoint_spec()) {
        Ok(_) => (true, None),
        Err(error) => (false, Some(error.to_string())),
    };

    StaticApiStatus {
        accepted,
        message,
        observed_generation: resource.metadata.generation,
    }
}

/// Write the acceptance status when it changed. Returns whether it wrote.
pub async fn reconcile_static_api(client: &dyn ClusterClient, resource: &StaticApi) -> Result<bool, Error> {
    if resource.metadata.deletion_timestamp.is_some() {
        return Ok(false);
    }

    let name = resource.name_any();
    let namespace = resource.namespace().ok_or(Error::MissingObjectKey("namespace"))?;
    let status = derive_api_status(resource);

    if resource.status.as_ref() == Some(&status) {
        return Ok(false);
    }

    client.patch_static_api_status(&namespace, &name, &status).await?;
    if status.accepted {
        tracing::info!(static_api = %name, namespace = %namespace, path = %resource.spec.path, "StaticAPI accepted");
    } else {
        tracing::warn!(
            static_api = %name,
            namespace = %namespace,
            path = %resource.spec.path,
            reason = status.message.as_deref().unwrap_or_default(),
            "StaticAPI rejected"
        );
    }
    Ok(true)
}
