//! The `SimpleApp` desired-state record.
//!
//! Defaults mirror the ones the API server injects at admission time, so a
//! manifest read from disk converges to the same children as one fetched from
//! the cluster.

use crate::error::{Result, SimpleAppError};
use crate::resources::is_valid_name;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// API group of the SimpleApp record
pub const API_GROUP: &str = "webapp.k8s.cmm.io";
/// API version of the SimpleApp record
pub const API_VERSION: &str = "v1";
/// Kind of the SimpleApp record
pub const KIND: &str = "SimpleApp";

/// Label carrying the owning record's kind on every child
pub const TYPE_LABEL: &str = "webapp.k8s.cmm.io/type";
/// Label carrying the owning record's name on every child
pub const NAME_LABEL: &str = "webapp.k8s.cmm.io/name";
/// Default annotation used to track the last applied child object
pub const LAST_APPLIED_ANNOTATION: &str = "webapp.k8s.cmm.io/last-applied";

/// Container image pull policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

impl PullPolicy {
    /// Value as written into a container spec
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
            PullPolicy::Never => "Never",
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Desired state of a SimpleApp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleAppSpec {
    /// Container image to deploy
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub image_pull_policy: PullPolicy,

    /// Names of secrets holding image pull credentials
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,

    /// Port the container listens on
    #[serde(default = "default_port")]
    pub container_port: i32,

    /// Deployment replica count; `None` leaves defaulting to the API server
    #[serde(default = "default_replicas")]
    pub replicas: Option<i32>,

    #[serde(default = "default_enabled")]
    pub service_enabled: bool,

    /// Port the service listens on, forwarded to `container_port`
    #[serde(default = "default_port")]
    pub service_port: i32,

    #[serde(default = "default_enabled")]
    pub ingress_enabled: bool,

    /// Host the ingress rule matches
    #[serde(default)]
    pub hostname: String,

    #[serde(default = "default_ingress_paths")]
    pub ingress_paths: Vec<String>,

    /// Annotations added to the ingress, overriding controller-wide defaults
    #[serde(default)]
    pub ingress_annotations: BTreeMap<String, String>,
}

fn default_port() -> i32 {
    80
}

fn default_replicas() -> Option<i32> {
    Some(1)
}

fn default_enabled() -> bool {
    true
}

fn default_ingress_paths() -> Vec<String> {
    vec!["/".to_string()]
}

impl Default for SimpleAppSpec {
    fn default() -> Self {
        Self {
            image: String::new(),
            image_pull_policy: PullPolicy::default(),
            image_pull_secrets: Vec::new(),
            container_port: default_port(),
            replicas: default_replicas(),
            service_enabled: default_enabled(),
            service_port: default_port(),
            ingress_enabled: default_enabled(),
            hostname: String::new(),
            ingress_paths: default_ingress_paths(),
            ingress_annotations: BTreeMap::new(),
        }
    }
}

/// Observed state of a SimpleApp. Currently carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleAppStatus {}

/// SimpleApp record as stored by the API server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleApp {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SimpleAppSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SimpleAppStatus>,
}

fn default_api_version() -> String {
    format!("{}/{}", API_GROUP, API_VERSION)
}

fn default_kind() -> String {
    KIND.to_string()
}

impl SimpleApp {
    /// Build a record with the given identity and spec
    pub fn new(namespace: &str, name: &str, spec: SimpleAppSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec,
            status: None,
        }
    }

    /// Record name, empty if unset
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Record namespace, empty if unset
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Kind used in the child type label. Falls back to `SimpleApp` when the
    /// record was decoded without type information.
    pub fn type_label(&self) -> &str {
        if self.kind.is_empty() {
            KIND
        } else {
            &self.kind
        }
    }

    /// The `{type, name}` label set stamped on every child and used as the
    /// workload/service selector
    pub fn child_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (TYPE_LABEL.to_string(), self.type_label().to_string()),
            (NAME_LABEL.to_string(), self.name().to_string()),
        ])
    }

    /// Check the schema invariants normally enforced at admission
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        if !is_valid_name(name) {
            return Err(SimpleAppError::validation_failed(
                KIND,
                format!("metadata.name '{}' is not a valid DNS-1123 name", name),
                "Use lowercase alphanumerics, '-' or '.', starting and ending with an alphanumeric",
            ));
        }
        if self.namespace().is_empty() {
            return Err(SimpleAppError::validation_failed(
                KIND,
                "metadata.namespace is empty",
                "SimpleApp is namespaced; set metadata.namespace",
            ));
        }

        let spec = &self.spec;
        for (field, port) in [
            ("containerPort", spec.container_port),
            ("servicePort", spec.service_port),
        ] {
            if !(1..=65535).contains(&port) {
                return Err(SimpleAppError::validation_failed(
                    KIND,
                    format!("{} {} is out of range", field, port),
                    "Use a TCP port between 1 and 65535",
                ));
            }
        }

        if let Some(replicas) = spec.replicas {
            if replicas < 0 {
                return Err(SimpleAppError::validation_failed(
                    KIND,
                    format!("replicas {} is negative", replicas),
                    "Set replicas to zero or more, or omit it",
                ));
            }
        }

        if spec.ingress_enabled && spec.ingress_paths.is_empty() {
            return Err(SimpleAppError::validation_failed(
                KIND,
                "ingressPaths is empty while ingressEnabled is true",
                "Add at least one path such as \"/\" or set ingressEnabled to false",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_from_empty_object() {
        let spec: SimpleAppSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, SimpleAppSpec::default());
        assert_eq!(spec.image_pull_policy, PullPolicy::IfNotPresent);
        assert_eq!(spec.container_port, 80);
        assert_eq!(spec.replicas, Some(1));
        assert!(spec.service_enabled);
        assert_eq!(spec.service_port, 80);
        assert!(spec.ingress_enabled);
        assert_eq!(spec.ingress_paths, vec!["/"]);
    }

    #[test]
    fn test_explicit_null_replicas_stays_unset() {
        let spec: SimpleAppSpec = serde_json::from_str(r#"{"replicas": null}"#).unwrap();
        assert_eq!(spec.replicas, None);
    }

    #[test]
    fn test_camel_case_fields() {
        let spec: SimpleAppSpec = serde_json::from_str(
            r#"{
                "image": "nginx:latest",
                "imagePullPolicy": "Always",
                "imagePullSecrets": ["regcred"],
                "containerPort": 8080,
                "serviceEnabled": false,
                "ingressPaths": ["/api", "/"],
                "ingressAnnotations": {"a": "b"}
            }"#,
        )
        .unwrap();
        assert_eq!(spec.image_pull_policy, PullPolicy::Always);
        assert_eq!(spec.image_pull_secrets, vec!["regcred"]);
        assert_eq!(spec.container_port, 8080);
        assert!(!spec.service_enabled);
        assert_eq!(spec.ingress_paths, vec!["/api", "/"]);
        assert_eq!(spec.ingress_annotations.get("a").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_child_labels() {
        let app = SimpleApp::new("default", "app", SimpleAppSpec::default());
        let labels = app.child_labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["webapp.k8s.cmm.io/type"], "SimpleApp");
        assert_eq!(labels["webapp.k8s.cmm.io/name"], "app");
        assert_eq!(LAST_APPLIED_ANNOTATION, "webapp.k8s.cmm.io/last-applied");
        assert_eq!(app.api_version, "webapp.k8s.cmm.io/v1");
    }

    #[test]
    fn test_type_label_falls_back_when_kind_missing() {
        let mut app = SimpleApp::new("default", "app", SimpleAppSpec::default());
        app.kind = String::new();
        assert_eq!(app.child_labels()[TYPE_LABEL], "SimpleApp");
    }

    #[test]
    fn test_validate() {
        let app = SimpleApp::new("default", "app", SimpleAppSpec::default());
        assert!(app.validate().is_ok());

        let mut bad = app.clone();
        bad.spec.container_port = 70000;
        assert!(bad.validate().is_err());

        let mut bad = app.clone();
        bad.spec.replicas = Some(-1);
        assert!(bad.validate().is_err());

        let mut bad = app.clone();
        bad.spec.ingress_paths.clear();
        assert!(bad.validate().is_err());

        // No paths is fine once ingress is off
        bad.spec.ingress_enabled = false;
        assert!(bad.validate().is_ok());

        let bad = SimpleApp::new("default", "My_App", SimpleAppSpec::default());
        assert!(bad.validate().is_err());
    }
}
