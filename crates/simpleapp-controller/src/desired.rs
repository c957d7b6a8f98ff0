//! Desired-state generation.
//!
//! Turns a `SimpleApp` spec into the Deployment, Service and Ingress it should
//! own. Everything here is pure: the same spec always yields identical objects,
//! which is what lets the apply engine detect "nothing changed".

use crate::child::ChildResource;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, LocalObjectReference, PodSpec, PodTemplateSpec, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use simpleapp_core::SimpleApp;
use std::collections::BTreeMap;

/// Path match type used for every ingress path
pub const PATH_TYPE_PREFIX: &str = "Prefix";

/// The three children generated for one record
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredChildren {
    pub workload: Deployment,
    pub service: Service,
    pub route: Ingress,
}

impl DesiredChildren {
    /// Children in apply order: workload, service, route
    pub fn into_ordered(self) -> [ChildResource; 3] {
        [
            ChildResource::Workload(self.workload),
            ChildResource::NetworkService(self.service),
            ChildResource::Route(self.route),
        ]
    }
}

/// Builds children from a record spec
#[derive(Debug, Clone, Default)]
pub struct DesiredStateGenerator {
    /// Ingress annotations applied to every route; per-record annotations win on conflict
    default_ingress_annotations: BTreeMap<String, String>,
}

impl DesiredStateGenerator {
    pub fn new(default_ingress_annotations: BTreeMap<String, String>) -> Self {
        Self {
            default_ingress_annotations,
        }
    }

    pub fn generate(&self, app: &SimpleApp) -> DesiredChildren {
        DesiredChildren {
            workload: workload(app),
            service: service(app),
            route: self.route(app),
        }
    }

    fn route(&self, app: &SimpleApp) -> Ingress {
        let spec = &app.spec;

        let paths = spec
            .ingress_paths
            .iter()
            .map(|path| HTTPIngressPath {
                path: Some(path.clone()),
                path_type: PATH_TYPE_PREFIX.to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: app.name().to_string(),
                        port: Some(ServiceBackendPort {
                            number: Some(spec.container_port),
                            name: None,
                        }),
                    }),
                    resource: None,
                },
            })
            .collect();

        let mut annotations = self.default_ingress_annotations.clone();
        annotations.extend(
            spec.ingress_annotations
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let mut metadata = child_meta(app);
        if !annotations.is_empty() {
            metadata.annotations = Some(annotations);
        }

        Ingress {
            metadata,
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(spec.hostname.clone()),
                    http: Some(HTTPIngressRuleValue { paths }),
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }
}

/// Generate children with no controller-wide ingress annotations
pub fn generate(app: &SimpleApp) -> DesiredChildren {
    DesiredStateGenerator::default().generate(app)
}

/// Name, namespace and `{type, name}` labels shared by every child
fn child_meta(app: &SimpleApp) -> ObjectMeta {
    ObjectMeta {
        name: Some(app.name().to_string()),
        namespace: Some(app.namespace().to_string()),
        labels: Some(app.child_labels()),
        ..Default::default()
    }
}

fn workload(app: &SimpleApp) -> Deployment {
    let spec = &app.spec;
    let labels = app.child_labels();

    let image_pull_secrets = if spec.image_pull_secrets.is_empty() {
        None
    } else {
        Some(
            spec.image_pull_secrets
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect(),
        )
    };

    Deployment {
        metadata: child_meta(app),
        spec: Some(DeploymentSpec {
            replicas: spec.replicas,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                match_expressions: None,
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: app.name().to_string(),
                        image: Some(spec.image.clone()),
                        image_pull_policy: Some(spec.image_pull_policy.as_str().to_string()),
                        ports: Some(vec![ContainerPort {
                            container_port: spec.container_port,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    image_pull_secrets,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

fn service(app: &SimpleApp) -> Service {
    let spec = &app.spec;

    Service {
        metadata: child_meta(app),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port: spec.service_port,
                target_port: Some(IntOrString::Int(spec.container_port)),
                ..Default::default()
            }]),
            selector: Some(app.child_labels()),
            ..Default::default()
        }),
        status: None,
    }
}
