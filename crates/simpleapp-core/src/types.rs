use serde::{Deserialize, Serialize};
use std::fmt;

/// GroupVersionKind uniquely identifies a Kubernetes resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group (e.g., "", "apps", "networking.k8s.io")
    pub group: String,
    /// API version (e.g., "v1")
    pub version: String,
    /// Resource kind (e.g., "Deployment", "SimpleApp")
    pub kind: String,
}

impl GroupVersionKind {
    /// Create a new GVK
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// The SimpleApp record type
    pub fn simple_app() -> Self {
        Self::new(crate::API_GROUP, crate::API_VERSION, crate::KIND)
    }

    /// apps/v1 Deployment
    pub fn deployment() -> Self {
        Self::new("apps", "v1", "Deployment")
    }

    /// core v1 Service
    pub fn service() -> Self {
        Self::new("", "v1", "Service")
    }

    /// networking.k8s.io/v1 Ingress
    pub fn ingress() -> Self {
        Self::new("networking.k8s.io", "v1", "Ingress")
    }

    /// Get the apiVersion string (group/version or just version)
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Get the full API path segment
    pub fn api_path(&self) -> String {
        if self.group.is_empty() {
            format!("api/{}", self.version)
        } else {
            format!("apis/{}/{}", self.group, self.version)
        }
    }

    /// Get the resource name (lowercase, plural)
    pub fn resource_name(&self) -> String {
        let lower = self.kind.to_lowercase();
        if lower.ends_with('s') {
            format!("{}es", lower)
        } else if lower.ends_with('y') {
            format!("{}ies", &lower[..lower.len() - 1])
        } else {
            format!("{}s", lower)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// ResourceKey identifies one namespaced object of a given type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// GroupVersionKind of the object
    pub gvk: GroupVersionKind,
    /// Namespace
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ResourceKey {
    /// Create a new ResourceKey
    pub fn new(gvk: GroupVersionKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gvk,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for a SimpleApp record
    pub fn simple_app(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(GroupVersionKind::simple_app(), namespace, name)
    }

    /// Get the API path for this object
    pub fn api_path(&self) -> String {
        format!("{}/{}", self.collection_path(), self.name)
    }

    /// Get the API path for the namespaced collection (without name)
    pub fn collection_path(&self) -> String {
        format!(
            "/{}/namespaces/{}/{}",
            self.gvk.api_path(),
            self.namespace,
            self.gvk.resource_name()
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.gvk, self.namespace, self.name)
    }
}
