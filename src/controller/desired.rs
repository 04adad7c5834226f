//! Desired children of a Static.
//!
//! # Responsibilities
//! - Resolve spec defaults (replicas, image, log level, resources)
//! - Resolve TLS sourcing: secret volume or in-container file paths
//! - Apply the result onto a Deployment and a Service
//!
//! # Design Decisions
//! - Everything is derived before any write, so an invalid spec leaves the
//!   existing children untouched
//! - Apply mutates only the fields the operator owns; fields defaulted by
//!   the API server are preserved, which keeps repeated passes write-free

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, ObjectFieldSelector, PodSpec, PodTemplateSpec,
    ResourceRequirements, SecretVolumeSource, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use crate::controller::error::Error;
use crate::crd::{Static, TlsSpec};

pub const DEFAULT_IMAGE: &str = "static-server:latest";
pub const DEFAULT_REPLICAS: i32 = 1;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const CONTAINER_NAME: &str = "static";
pub const CONTAINER_PORT: i32 = 8080;
pub const SERVICE_PORT: i32 = 80;

pub const TLS_VOLUME: &str = "tls";
pub const TLS_MOUNT_PATH: &str = "/tls";
const SECRET_DEFAULT_MODE: i32 = 0o644;

/// How the server finds its certificate material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMaterial {
    /// Secret mounted read-only at `/tls`.
    Secret { secret_name: String, verify_client: bool },
    /// Paths that already exist inside the container.
    Files {
        certificate: Option<String>,
        key: Option<String>,
        ca: Option<String>,
        verify_client: bool,
    },
}

impl TlsMaterial {
    fn from_spec(tls: &TlsSpec) -> Result<Option<Self>, Error> {
        if !tls.enabled {
            return Ok(None);
        }

        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let secret_name = non_empty(&tls.secret_name);
        let certificate = non_empty(&tls.certificate);
        let key = non_empty(&tls.key);
        let ca = non_empty(&tls.ca);

        match secret_name {
            Some(_) if certificate.is_some() || key.is_some() || ca.is_some() => Err(Error::Configuration(
                "cannot specify both secretName and file paths (certificate/key/ca) in TLS config".to_string(),
            )),
            Some(secret_name) => Ok(Some(Self::Secret {
                secret_name,
                verify_client: tls.verify_client,
            })),
            None => Ok(Some(Self::Files {
                certificate,
                key,
                ca,
                verify_client: tls.verify_client,
            })),
        }
    }

    fn verify_client(&self) -> bool {
        match self {
            Self::Secret { verify_client, .. } | Self::Files { verify_client, .. } => *verify_client,
        }
    }
}

/// Everything the reconciler writes for one Static, computed up front.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredWorkload {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub image: String,
    pub log_level: String,
    pub resources: ResourceRequirements,
    pub tls: Option<TlsMaterial>,
    pub owner: OwnerReference,
}

impl DesiredWorkload {
    pub fn derive(resource: &Static, default_image: &str) -> Result<Self, Error> {
        let name = resource.metadata.name.clone().ok_or(Error::MissingObjectKey("name"))?;
        let namespace = resource.namespace().ok_or(Error::MissingObjectKey("namespace"))?;
        let owner = resource
            .controller_owner_ref(&())
            .ok_or(Error::MissingObjectKey("uid"))?;

        let spec = &resource.spec;
        let replicas = spec.replicas.unwrap_or(DEFAULT_REPLICAS);
        if replicas < 0 {
            return Err(Error::Configuration(format!("replicas must not be negative, got {replicas}")));
        }

        let tls = match &spec.tls {
            Some(tls) => TlsMaterial::from_spec(tls)?,
            None => None,
        };

        Ok(Self {
            name,
            namespace,
            replicas,
            image: spec
                .image
                .clone()
                .filter(|image| !image.is_empty())
                .unwrap_or_else(|| default_image.to_string()),
            log_level: spec
                .log_level
                .clone()
                .filter(|level| !level.is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            resources: spec.resources.clone().unwrap_or_else(default_resources),
            tls,
            owner,
        })
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("app".to_string(), "static".to_string()),
            ("app.kubernetes.io/name".to_string(), "static".to_string()),
            ("app.kubernetes.io/instance".to_string(), self.name.clone()),
            ("app.kubernetes.io/managed-by".to_string(), "static-operator".to_string()),
        ])
    }

    /// Container environment, in a stable order.
    pub fn env(&self) -> Vec<EnvVar> {
        let mut env = vec![
            env_value("HOST", "0.0.0.0"),
            env_value("PORT", &CONTAINER_PORT.to_string()),
            env_value("LOG_LEVEL", &self.log_level),
            env_value("IN_CLUSTER", "true"),
            EnvVar {
                name: "NAMESPACE".to_string(),
                value_from: Some(EnvVarSource {
                    field_ref: Some(ObjectFieldSelector {
                        api_version: Some("v1".to_string()),
                        field_path: "metadata.namespace".to_string(),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];

        let Some(tls) = &self.tls else {
            return env;
        };

        env.push(env_value("TLS_ENABLED", "true"));
        match tls {
            TlsMaterial::Secret { verify_client, .. } => {
                env.push(env_value("TLS_CERTIFICATE", &format!("{TLS_MOUNT_PATH}/tls.crt")));
                env.push(env_value("TLS_KEY", &format!("{TLS_MOUNT_PATH}/tls.key")));
                if *verify_client {
                    env.push(env_value("TLS_CA", &format!("{TLS_MOUNT_PATH}/ca.crt")));
                }
            }
            TlsMaterial::Files {
                certificate, key, ca, ..
            } => {
                for (name, value) in [("TLS_CERTIFICATE", certificate), ("TLS_KEY", key), ("TLS_CA", ca)] {
                    if let Some(value) = value {
                        env.push(env_value(name, value));
                    }
                }
            }
        }
        if tls.verify_client() {
            env.push(env_value("TLS_VERIFY_CLIENT", "true"));
        }
        env
    }

    fn secret_name(&self) -> Option<&str> {
        match &self.tls {
            Some(TlsMaterial::Secret { secret_name, .. }) => Some(secret_name),
            _ => None,
        }
    }

    /// A Deployment carrying only identity; `apply_to_deployment` fills it.
    pub fn new_deployment(&self) -> Deployment {
        Deployment {
            metadata: self.child_meta(),
            ..Default::default()
        }
    }

    pub fn new_service(&self) -> Service {
        Service {
            metadata: self.child_meta(),
            ..Default::default()
        }
    }

    fn child_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            ..Default::default()
        }
    }

    pub fn apply_to_deployment(&self, deployment: &mut Deployment) {
        let labels = self.labels();
        deployment.metadata.labels = Some(labels.clone());
        ensure_owner_reference(&mut deployment.metadata, &self.owner);

        let spec = deployment.spec.get_or_insert_with(DeploymentSpec::default);
        spec.replicas = Some(self.replicas);
        spec.selector = LabelSelector {
            match_labels: Some(labels.clone()),
            ..Default::default()
        };

        let template: &mut PodTemplateSpec = &mut spec.template;
        template.metadata.get_or_insert_with(ObjectMeta::default).labels = Some(labels);

        let pod = template.spec.get_or_insert_with(PodSpec::default);
        let index = match pod.containers.iter().position(|c| c.name == CONTAINER_NAME) {
            Some(index) => index,
            None => {
                pod.containers.push(Container {
                    name: CONTAINER_NAME.to_string(),
                    ..Default::default()
                });
                pod.containers.len() - 1
            }
        };

        let container = &mut pod.containers[index];
        container.image = Some(self.image.clone());
        container.image_pull_policy = Some("IfNotPresent".to_string());
        container.ports = Some(vec![ContainerPort {
            name: Some("http".to_string()),
            container_port: CONTAINER_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]);
        container.env = Some(self.env());
        container.resources = Some(self.resources.clone());

        let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
        mounts.retain(|mount| mount.name != TLS_VOLUME);
        if self.secret_name().is_some() {
            mounts.push(VolumeMount {
                name: TLS_VOLUME.to_string(),
                mount_path: TLS_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            });
        }
        if mounts.is_empty() {
            container.volume_mounts = None;
        }

        let volumes = pod.volumes.get_or_insert_with(Vec::new);
        volumes.retain(|volume| volume.name != TLS_VOLUME);
        if let Some(secret_name) = self.secret_name() {
            volumes.push(Volume {
                name: TLS_VOLUME.to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(secret_name.to_string()),
                    default_mode: Some(SECRET_DEFAULT_MODE),
                    ..Default::default()
                }),
                ..Default::default()
            });
        }
        if volumes.is_empty() {
            pod.volumes = None;
        }
    }

    pub fn apply_to_service(&self, service: &mut Service) {
        let labels = self.labels();
        service.metadata.labels = Some(labels.clone());
        ensure_owner_reference(&mut service.metadata, &self.owner);

        let spec = service.spec.get_or_insert_with(ServiceSpec::default);
        spec.selector = Some(labels);
        spec.type_ = Some("ClusterIP".to_string());
        spec.ports = Some(vec![ServicePort {
            name: Some("http".to_string()),
            port: SERVICE_PORT,
            target_port: Some(IntOrString::Int(CONTAINER_PORT)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]);
    }
}

/// Requests 50m/64Mi, limits 200m/128Mi.
pub fn default_resources() -> ResourceRequirements {
    let quantities = |cpu: &str, memory: &str| {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    };
    ResourceRequirements {
        limits: Some(quantities("200m", "128Mi")),
        requests: Some(quantities("50m", "64Mi")),
        ..Default::default()
    }
}

/// Add `owner` unless a reference with the same uid is already present.
pub fn ensure_owner_reference(meta: &mut ObjectMeta, owner: &OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    if !refs.iter().any(|existing| existing.uid == owner.uid) {
        refs.push(owner.clone());
    }
}

fn env_value(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}
