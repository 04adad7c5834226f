//! StaticAPI CRD: one served path declared in the cluster.
//!
//! ```yaml
//! apiVersion: static.dev/v1alpha1
//! kind: StaticAPI
//! metadata:
//!   name: health
//! spec:
//!   path: /health
//!   methods:
//!     - method: GET
//!       statusCode: 200
//!       body: ok
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::routing::{EndpointSpec, MethodSpec};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "static.dev",
    version = "v1alpha1",
    kind = "StaticAPI",
    root = "StaticApi",
    plural = "staticapis",
    shortname = "sapi",
    namespaced,
    status = "StaticApiStatus",
    printcolumn = r#"{"name":"Path","type":"string","jsonPath":".spec.path"}"#,
    printcolumn = r#"{"name":"Accepted","type":"boolean","jsonPath":".status.accepted"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StaticApiSpec {
    /// Exact request path
    pub path: String,

    /// Responses per method
    pub methods: Vec<MethodSpec>,
}

impl StaticApiSpec {
    pub fn to_endpoint_spec(&self) -> EndpointSpec {
        EndpointSpec {
            path: self.path.clone(),
            methods: self.methods.clone(),
        }
    }
}

/// Written by the operator after validating the spec.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaticApiStatus {
    /// Whether servers will load this entry
    #[serde(default)]
    pub accepted: bool,

    /// Validation error, if any. Serialized as null when cleared so a merge
    /// patch removes a stale message.
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
