//! Custom Resource Definitions.
//!
//! Both kinds live in group `static.dev`, version `v1alpha1`, are namespaced
//! and expose a status subresource.

mod static_api;
mod workload;

use kube::CustomResourceExt;

pub use static_api::{StaticApi, StaticApiSpec, StaticApiStatus};
pub use workload::{Static, StaticSpec, StaticStatus, TlsSpec};

/// All CRD manifests as a multi-document YAML stream.
pub fn crd_manifests() -> Result<String, serde_yaml::Error> {
    let manifests = [
        serde_yaml::to_string(&Static::crd())?,
        serde_yaml::to_string(&StaticApi::crd())?,
    ];
    Ok(manifests.join("---\n"))
}

#[cfg(test)]
mod tests {
    use kube::Resource;

    use super::*;

    #[test]
    fn test_resource_names() {
        assert_eq!(Static::crd_name(), "statics.static.dev");
        assert_eq!(StaticApi::crd_name(), "staticapis.static.dev");
        assert_eq!(StaticApi::kind(&()), "StaticAPI");
        assert_eq!(StaticApi::api_version(&()), "static.dev/v1alpha1");
    }

    #[test]
    fn test_short_name_registered() {
        let crd = StaticApi::crd();
        assert_eq!(crd.spec.names.short_names, Some(vec!["sapi".to_string()]));
        assert!(crd.spec.versions[0].subresources.is_some());
    }

    #[test]
    fn test_manifests_contain_both_kinds() {
        let yaml = crd_manifests().unwrap();
        assert!(yaml.contains("kind: Static\n"));
        assert!(yaml.contains("kind: StaticAPI\n"));
    }

    #[test]
    fn test_static_spec_camel_case() {
        let spec: StaticSpec = serde_json::from_value(serde_json::json!({
            "logLevel": "debug",
            "tls": {"enabled": true, "secretName": "certs", "verifyClient": true}
        }))
        .unwrap();

        assert_eq!(spec.log_level.as_deref(), Some("debug"));
        let tls = spec.tls.unwrap();
        assert_eq!(tls.secret_name.as_deref(), Some("certs"));
        assert!(tls.verify_client);
    }
}
