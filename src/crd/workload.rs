//! Static CRD: a managed static-server workload.
//!
//! A Static is reconciled into a Deployment running the server in cluster
//! mode and a Service in front of it. Both children carry an owner reference
//! back to the Static so deleting it cascades.
//!
//! Example:
//! ```yaml
//! apiVersion: static.dev/v1alpha1
//! kind: Static
//! metadata:
//!   name: mock-api
//! spec:
//!   replicas: 2
//!   logLevel: debug
//!   tls:
//!     enabled: true
//!     secretName: mock-api-tls
//! ```

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "static.dev",
    version = "v1alpha1",
    kind = "Static",
    plural = "statics",
    namespaced,
    status = "StaticStatus",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Message","type":"string","jsonPath":".status.message"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StaticSpec {
    /// Desired pod count (default 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Server image (default set by the operator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Server log level (default info)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Container resources (default requests 50m/64Mi, limits 200m/128Mi)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSpec>,
}

/// TLS material for the managed server.
///
/// Either `secretName` or the `certificate`/`key` paths, never both.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    #[serde(default)]
    pub enabled: bool,

    /// Secret with tls.crt, tls.key and optionally ca.crt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Certificate path inside the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    /// Key path inside the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// CA bundle path inside the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,

    /// Require client certificates
    #[serde(default)]
    pub verify_client: bool,
}

/// Derived from the managed Deployment.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaticStatus {
    #[serde(default)]
    pub ready: bool,

    /// Ready replicas
    #[serde(default)]
    pub replicas: i32,

    #[serde(default)]
    pub desired_replicas: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
